/// PCM buffers and the mixed track.
pub mod buffer;
/// Offline narration + music mixer.
pub mod mix;
