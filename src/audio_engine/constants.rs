//! Audio engine configuration constants and limits.

/// Minimum volume level (silence).
pub const VOLUME_MIN: f32 = 0.0;

/// Maximum volume level (100%).
pub const VOLUME_MAX: f32 = 1.0;

/// Largest master volume accepted from the operator, in percent.
pub const MASTER_PERCENT_MAX: f32 = 100.0;

/// Frames handed to the resampler per processing chunk.
pub const RESAMPLE_CHUNK_FRAMES: usize = 4096;
