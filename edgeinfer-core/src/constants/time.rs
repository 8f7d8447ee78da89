//! Time Constants
//!
//! Intervals are carried in milliseconds as `u32` everywhere in the framework.

/// Largest timer interval accepted (ms).
///
/// Keeps the value within a signed 32-bit `timespec` on 32-bit targets,
/// roughly 24.8 days.
pub const MAX_TIMER_INTERVAL_MS: u32 = 0x7FFF_FFFF;
