fn main() {
    println!("cargo:rerun-if-changed=data/doorbell.txt");

    // The ESP-IDF sysenv only exists when building the flash image.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
