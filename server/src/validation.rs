use studio_core::ScriptLine;

use crate::error::ApiError;

/// Longest download name accepted from clients.
const MAX_FILE_NAME_LENGTH: usize = 200;

/// Validate a synthesis request for one script line
pub fn validate_tts_request(line: &ScriptLine) -> Result<(), ApiError> {
    line.validate().map_err(|e| ApiError::InvalidInput(e.to_string()))
}

/// Validate a client supplied download name
pub fn validate_file_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("File name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "File name too long (max {} characters)",
            MAX_FILE_NAME_LENGTH
        )));
    }
    if name.contains(&['/', '\\'][..]) {
        return Err(ApiError::InvalidInput(
            "File name cannot contain path separators".to_string(),
        ));
    }
    Ok(())
}
