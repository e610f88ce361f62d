use thiserror::Error;

/// Failures of the PCM to WAV conversion.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("invalid base64 PCM data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("PCM payload of {0} bytes does not fit in a RIFF container")]
    PayloadTooLarge(usize),
}

/// Reasons a script line cannot be sent for synthesis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Script text cannot be empty")]
    EmptyScript,

    #[error("Script too long ({len} characters, max {max})")]
    ScriptTooLong { len: usize, max: usize },

    #[error("Unknown voice '{0}'. Available voices: {1}")]
    UnknownVoice(String, String),
}
