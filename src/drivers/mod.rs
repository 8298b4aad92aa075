//! Switch and audio drivers.

pub mod audio;
pub mod switch;
