//! Audio playback pipeline.
//!
//! [`WavPlayer`] implements [`AudioPort`]: `open` reads the track header
//! with `hound` and starts the output; each `pump` decodes chunks, applies
//! the gain and hands them to a [`PcmOutput`] until the output stops
//! accepting samples.  Output writes never block; samples the output cannot
//! take yet are kept and offered again on the next pump.
//!
//! Accepted tracks: integer PCM, 8 or 16 bit, mono or stereo.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`I2sOutput`] drives an I2S standard-mode TX channel.
//! On host/test: [`NullOutput`] accepts and counts samples.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use hound::{SampleFormat, WavIntoSamples, WavReader, WavSpec};
use log::{debug, info, warn};

use crate::app::ports::{AudioError, AudioPort};

/// Samples decoded per chunk.
pub const CHUNK_SAMPLES: usize = 256;

type TrackSamples = WavIntoSamples<BufReader<File>, i16>;

/// A PCM sink.
pub trait PcmOutput {
    /// Configure for a new stream.  Called once per play-through.
    fn start(&mut self, sample_rate: u32, channels: u16) -> Result<(), AudioError>;

    /// Queue interleaved samples without blocking.  Returns how many were
    /// accepted.
    fn write(&mut self, samples: &[i16]) -> usize;

    /// Release the output.
    fn stop(&mut self);
}

/// Scale a sample by `gain`; float-to-int casts saturate.
pub fn apply_gain(sample: i16, gain: f32) -> i16 {
    (f32::from(sample) * gain) as i16
}

fn check_spec(spec: &WavSpec) -> Result<(), AudioError> {
    let supported = spec.sample_format == SampleFormat::Int
        && matches!(spec.bits_per_sample, 8 | 16)
        && matches!(spec.channels, 1 | 2)
        && spec.sample_rate > 0;
    if supported {
        Ok(())
    } else {
        Err(AudioError::UnsupportedFormat)
    }
}

fn map_hound(e: hound::Error) -> AudioError {
    match e {
        hound::Error::IoError(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
            AudioError::UnsupportedFormat
        }
        hound::Error::IoError(_) => AudioError::Io,
        _ => AudioError::UnsupportedFormat,
    }
}

pub struct WavPlayer<O: PcmOutput> {
    output: O,
    root: PathBuf,
    samples: Option<TrackSamples>,
    /// Left shift that brings 8-bit samples to 16-bit scale.
    widen: u32,
    gain: f32,
    chunk: [i16; CHUNK_SAMPLES],
    chunk_len: usize,
    chunk_pos: usize,
}

impl<O: PcmOutput> WavPlayer<O> {
    /// Tracks are resolved relative to `root`.
    pub fn new(output: O, root: impl Into<PathBuf>) -> Self {
        Self {
            output,
            root: root.into(),
            samples: None,
            widen: 0,
            gain: 1.0,
            chunk: [0; CHUNK_SAMPLES],
            chunk_len: 0,
            chunk_pos: 0,
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn is_open(&self) -> bool {
        self.samples.is_some()
    }

    fn close(&mut self) {
        if self.samples.take().is_some() {
            self.output.stop();
        }
        self.chunk_len = 0;
        self.chunk_pos = 0;
    }

    fn open_reader(&self, track: &str) -> Result<WavReader<BufReader<File>>, AudioError> {
        let path = self.root.join(track.trim_start_matches('/'));
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AudioError::TrackNotFound,
            _ => AudioError::Io,
        })?;
        WavReader::new(BufReader::new(file)).map_err(map_hound)
    }

    /// Decode the next chunk.  `Ok(0)` at end of track.
    fn refill(&mut self) -> Result<usize, AudioError> {
        let Some(samples) = self.samples.as_mut() else {
            return Ok(0);
        };
        let mut n = 0;
        for slot in &mut self.chunk {
            match samples.next() {
                Some(Ok(s)) => *slot = apply_gain(s << self.widen, self.gain),
                Some(Err(e)) => return Err(map_hound(e)),
                None => break,
            }
            n += 1;
        }
        self.chunk_len = n;
        self.chunk_pos = 0;
        Ok(n)
    }
}

impl<O: PcmOutput> AudioPort for WavPlayer<O> {
    fn open(&mut self, track: &str, gain: f32) -> Result<(), AudioError> {
        self.close();

        let reader = self.open_reader(track)?;
        let spec = reader.spec();
        check_spec(&spec)?;
        self.output.start(spec.sample_rate, spec.channels)?;
        info!(
            "Audio: '{}' {} Hz, {} ch, {} bit, gain {:.2}",
            track, spec.sample_rate, spec.channels, spec.bits_per_sample, gain
        );

        self.widen = if spec.bits_per_sample == 8 { 8 } else { 0 };
        self.samples = Some(reader.into_samples());
        self.gain = gain;
        Ok(())
    }

    fn pump(&mut self) -> bool {
        if self.samples.is_none() {
            return false;
        }

        loop {
            if self.chunk_pos == self.chunk_len {
                match self.refill() {
                    Ok(0) => return false,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Audio: decode failed: {}", e);
                        return false;
                    }
                }
            }

            let pending = &self.chunk[self.chunk_pos..self.chunk_len];
            let accepted = self.output.write(pending);
            self.chunk_pos += accepted;
            if accepted < pending.len() {
                // Output full; resume here next tick.
                return true;
            }
        }
    }

    fn stop(&mut self) {
        debug!("Audio: stop");
        self.close();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Outputs
// ═══════════════════════════════════════════════════════════════

/// Host output: swallows everything.
#[derive(Debug, Default)]
pub struct NullOutput {
    pub samples_written: usize,
    pub started: u32,
    pub running: bool,
}

impl PcmOutput for NullOutput {
    fn start(&mut self, _sample_rate: u32, _channels: u16) -> Result<(), AudioError> {
        self.started += 1;
        self.running = true;
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> usize {
        self.samples_written += samples.len();
        samples.len()
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[cfg(target_os = "espidf")]
pub use i2s::I2sOutput;

#[cfg(target_os = "espidf")]
mod i2s {
    use core::ffi::c_void;
    use core::ptr;

    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::PcmOutput;
    use crate::app::ports::AudioError;
    use crate::pins;

    /// I2S standard-mode (Philips) TX channel on port 0.
    ///
    /// The channel is created on `start` and deleted on `stop`, so every
    /// play-through gets a clock configured for its own sample rate.
    pub struct I2sOutput {
        handle: i2s_chan_handle_t,
    }

    impl I2sOutput {
        pub fn new() -> Self {
            Self {
                handle: ptr::null_mut(),
            }
        }

        fn release(&mut self) {
            if self.handle.is_null() {
                return;
            }
            // SAFETY: handle was created by i2s_new_channel and is only
            // used from the main task.
            unsafe {
                i2s_channel_disable(self.handle);
                i2s_del_channel(self.handle);
            }
            self.handle = ptr::null_mut();
        }
    }

    impl PcmOutput for I2sOutput {
        fn start(&mut self, sample_rate: u32, channels: u16) -> Result<(), AudioError> {
            self.release();

            let chan_cfg = i2s_chan_config_t {
                id: i2s_port_t_I2S_NUM_0,
                role: i2s_role_t_I2S_ROLE_MASTER,
                dma_desc_num: 6,
                dma_frame_num: 240,
                ..Default::default()
            };
            let mut handle: i2s_chan_handle_t = ptr::null_mut();
            // SAFETY: out-pointer is valid; no RX channel requested.
            let ret = unsafe { i2s_new_channel(&chan_cfg, &mut handle, ptr::null_mut()) };
            if ret != ESP_OK {
                warn!("I2S: channel alloc failed (rc={})", ret);
                return Err(AudioError::OutputInit);
            }
            self.handle = handle;

            let slot_mode = if channels == 1 {
                i2s_slot_mode_t_I2S_SLOT_MODE_MONO
            } else {
                i2s_slot_mode_t_I2S_SLOT_MODE_STEREO
            };
            let std_cfg = i2s_std_config_t {
                clk_cfg: i2s_std_clk_config_t {
                    sample_rate_hz: sample_rate,
                    clk_src: soc_periph_i2s_clk_src_t_I2S_CLK_SRC_DEFAULT,
                    mclk_multiple: i2s_mclk_multiple_t_I2S_MCLK_MULTIPLE_256,
                    ..Default::default()
                },
                slot_cfg: i2s_std_slot_config_t {
                    data_bit_width: i2s_data_bit_width_t_I2S_DATA_BIT_WIDTH_16BIT,
                    slot_bit_width: i2s_slot_bit_width_t_I2S_SLOT_BIT_WIDTH_AUTO,
                    slot_mode,
                    slot_mask: i2s_std_slot_mask_t_I2S_STD_SLOT_BOTH,
                    ws_width: 16,
                    ws_pol: false,
                    bit_shift: true,
                    ..Default::default()
                },
                gpio_cfg: i2s_std_gpio_config_t {
                    mclk: gpio_num_t_GPIO_NUM_NC,
                    bclk: pins::I2S_BCLK_GPIO,
                    ws: pins::I2S_WS_GPIO,
                    dout: pins::I2S_DOUT_GPIO,
                    din: gpio_num_t_GPIO_NUM_NC,
                    ..Default::default()
                },
            };

            // SAFETY: handle is a freshly allocated TX channel.
            let ret = unsafe { i2s_channel_init_std_mode(self.handle, &std_cfg) };
            if ret != ESP_OK {
                warn!("I2S: std mode init failed (rc={})", ret);
                self.release();
                return Err(AudioError::OutputInit);
            }
            // SAFETY: channel initialised above.
            let ret = unsafe { i2s_channel_enable(self.handle) };
            if ret != ESP_OK {
                warn!("I2S: enable failed (rc={})", ret);
                self.release();
                return Err(AudioError::OutputInit);
            }
            info!("I2S: {} Hz, {} ch", sample_rate, channels);
            Ok(())
        }

        fn write(&mut self, samples: &[i16]) -> usize {
            if self.handle.is_null() || samples.is_empty() {
                return 0;
            }
            let mut written: usize = 0;
            // SAFETY: the buffer outlives the call; a zero timeout makes the
            // write return as soon as the DMA queue is full.
            unsafe {
                i2s_channel_write(
                    self.handle,
                    samples.as_ptr() as *const c_void,
                    core::mem::size_of_val(samples),
                    &mut written,
                    0,
                );
            }
            written / 2
        }

        fn stop(&mut self) {
            self.release();
        }
    }

    impl Drop for I2sOutput {
        fn drop(&mut self) {
            self.release();
        }
    }
}
