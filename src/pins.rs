//! GPIO / peripheral pin assignments for the doorbell board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Doorbell switch
// ---------------------------------------------------------------------------

/// Digital input with pull-up: LOW while the doorbell button is held.
/// `None` builds the firmware without a switch (web and bus rings only).
pub const DOORBELL_SWITCH_GPIO: Option<i32> = Some(12);

// ---------------------------------------------------------------------------
// Audio output (I2S DAC / class-D amplifier, e.g. MAX98357A)
// ---------------------------------------------------------------------------

/// I2S bit clock.
pub const I2S_BCLK_GPIO: i32 = 26;
/// I2S word select (LRCLK).
pub const I2S_WS_GPIO: i32 = 25;
/// I2S serial data out.
pub const I2S_DOUT_GPIO: i32 = 22;
