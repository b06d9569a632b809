pub mod tts;
pub use tts::{GoogleTts, SpeechSynthesizer};
