pub mod text;
pub mod tts;
