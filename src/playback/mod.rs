//! Interactive playback: a wall-clock driven cursor that renders frames and schedules audio.

/// Time sources.
pub mod clock;
/// Sound-device output.
pub mod device;
/// Live audio output abstraction.
pub mod output;
/// Playback state machine.
pub mod player;
