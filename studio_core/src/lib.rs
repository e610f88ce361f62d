//! Core types for the script-to-speech studio.
//!
//! * [`wav`] wraps raw speech-service PCM in a playable WAV container.
//! * [`script`] holds the dialogue-line model, the voice catalogue and
//!   download naming.

pub mod error;
pub mod script;
pub mod wav;

pub use error::{ScriptError, WavError};
pub use script::{
    ascii_file_name, download_file_name, find_voice, ScriptLine, VoiceOption, DEFAULT_VOICE,
    MAX_SCRIPT_CHARS, VOICE_OPTIONS,
};
pub use wav::{
    decode_pcm_base64, pcm_duration_ms, pcm_to_wav, wav_from_base64_pcm, HEADER_LEN,
    SAMPLE_RATE, WAV_MIME_TYPE,
};
