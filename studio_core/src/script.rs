//! Dialogue lines and the voice catalogue.

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// Maximum script length accepted for a single line.
pub const MAX_SCRIPT_CHARS: usize = 5000;

pub const DEFAULT_VOICE: &str = "Kore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Prebuilt voices offered by the speech service.
pub const VOICE_OPTIONS: &[VoiceOption] = &[
    VoiceOption { value: "Kore", label: "Kore (Nữ - Hàn Quốc)" },
    VoiceOption { value: "Puck", label: "Puck (Nam - Anh)" },
    VoiceOption { value: "Charon", label: "Charon (Nam - Hà Lan)" },
    VoiceOption { value: "Fenrir", label: "Fenrir (Nam - Mexico)" },
    VoiceOption { value: "Zephyr", label: "Zephyr (Nữ - Mỹ)" },
];

pub fn find_voice(value: &str) -> Option<&'static VoiceOption> {
    VOICE_OPTIONS.iter().find(|v| v.value == value)
}

/// One row of the script table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLine {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Base64 PCM returned by the speech service for the current text.
    #[serde(default)]
    pub audio_data: Option<String>,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl ScriptLine {
    /// Blank row using the default voice.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            character: String::new(),
            script: String::new(),
            notes: String::new(),
            voice: default_voice(),
            audio_data: None,
        }
    }

    pub fn validate(&self) -> Result<(), ScriptError> {
        validate_script(&self.script)?;
        validate_voice(&self.voice)
    }

    /// Download name for this line when shown at zero-based `index`.
    pub fn file_name(&self, index: usize) -> String {
        download_file_name(&self.character, index)
    }
}

pub fn validate_script(script: &str) -> Result<(), ScriptError> {
    if script.trim().is_empty() {
        return Err(ScriptError::EmptyScript);
    }
    let len = script.chars().count();
    if len > MAX_SCRIPT_CHARS {
        return Err(ScriptError::ScriptTooLong { len, max: MAX_SCRIPT_CHARS });
    }
    Ok(())
}

pub fn validate_voice(voice: &str) -> Result<(), ScriptError> {
    if find_voice(voice).is_some() {
        return Ok(());
    }
    let available = VOICE_OPTIONS
        .iter()
        .map(|v| v.value)
        .collect::<Vec<_>>()
        .join(", ");
    Err(ScriptError::UnknownVoice(voice.to_string(), available))
}

/// Download name for the line at zero-based `index`: `{character}_{n}.wav`,
/// or `audio_{n}.wav` when the row has no character.
pub fn download_file_name(character: &str, index: usize) -> String {
    let character = character.trim();
    let stem = if character.is_empty() { "audio" } else { character };
    format!("{}_{}.wav", stem, index.saturating_add(1))
}

/// Header-safe form of a file name: anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
pub fn ascii_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
