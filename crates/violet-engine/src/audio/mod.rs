//! Streaming music and sound effects.
//!
//! - `AudioHandle`: game-thread API, opens sources and queues requests
//! - `Mixer`: audio-thread state (music stack, command FIFO, effect pool)
//! - `StreamingSource`: a decoder with loop window, volume and fade state
//! - `AudioOutput`: cpal stream feeding device buffers from the mixer
//!
//! PCM is interleaved stereo `i16` at 44.1 kHz. Fades move 0.05 per mixer
//! buffer, so their length depends on the buffer cadence, not wall time.

mod decoder;
mod handle;
mod mixer;
mod ogg;
mod output;
mod source;

pub use decoder::{LoopWindow, MemoryDecoder, PcmDecoder, parse_loop_tags};
pub use handle::{AudioHandle, MusicOptions, OggOpener, SourceOpener, channel};
pub use mixer::{AudioMessage, Mixer, MusicCommand, MusicCommandKind, mix_into};
pub use ogg::OggDecoder;
pub use output::{AudioOutput, MixerPump};
pub use source::StreamingSource;

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: usize = 2;
/// Bytes per mixer buffer.
pub const BUFFER_BYTES: usize = 4096;
pub const BUFFER_SAMPLES: usize = BUFFER_BYTES / 2;
pub const BUFFER_FRAMES: usize = BUFFER_SAMPLES / CHANNELS;
/// Volume change per mixer buffer while fading.
pub const FADE_STEP: f32 = 0.05;
