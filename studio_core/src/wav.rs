//! PCM to WAV (RIFF) container synthesis.
//!
//! The speech service returns raw 16-bit little-endian mono PCM at 24 kHz as a
//! base64 string. Browsers and download tools need a self-describing file, so
//! the payload is wrapped in the canonical 44-byte RIFF/WAVE header and copied
//! verbatim behind it.

use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine as _,
};
use std::borrow::Cow;

use crate::error::WavError;

pub const SAMPLE_RATE: u32 = 24_000;
pub const NUM_CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const BLOCK_ALIGN: u16 = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
pub const BYTE_RATE: u32 = SAMPLE_RATE * BLOCK_ALIGN as u32;
pub const HEADER_LEN: usize = 44;
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of everything in the RIFF chunk that precedes the data payload.
const RIFF_OVERHEAD: u32 = 36;

/// Standard alphabet, padding optional, trailing bits ignored: the same
/// leniency a browser `atob` applies to speech service payloads.
const PCM_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a base64 PCM payload into raw sample bytes.
///
/// ASCII whitespace is skipped. Any other character outside the standard
/// alphabet fails with [`WavError::Decode`].
pub fn decode_pcm_base64(input: &str) -> Result<Vec<u8>, WavError> {
    let compact: Cow<'_, str> = if input.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(input.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(input)
    };
    Ok(PCM_BASE64.decode(compact.as_bytes())?)
}

/// Wrap raw PCM bytes in a 44-byte WAV header.
///
/// The payload is not inspected: an odd byte count (a truncated final sample)
/// is copied through as-is.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, WavError> {
    let data_size = u32::try_from(pcm.len())
        .ok()
        .filter(|n| n.checked_add(RIFF_OVERHEAD).is_some())
        .ok_or(WavError::PayloadTooLarge(pcm.len()))?;
    let riff_size = RIFF_OVERHEAD + data_size;

    let mut out = Vec::<u8>::with_capacity(HEADER_LEN + pcm.len());

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&BYTE_RATE.to_le_bytes());
    out.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(pcm);

    debug_assert_eq!(out.len(), HEADER_LEN + pcm.len());
    Ok(out)
}

/// Build a complete WAV file from a base64 PCM payload.
///
/// Decoding happens first, so invalid input never produces a partial buffer.
pub fn wav_from_base64_pcm(input: &str) -> Result<Vec<u8>, WavError> {
    let pcm = decode_pcm_base64(input)?;
    pcm_to_wav(&pcm)
}

/// Playback length in milliseconds of `pcm_len` bytes at the fixed format.
pub fn pcm_duration_ms(pcm_len: usize) -> u64 {
    let frames = (pcm_len / BLOCK_ALIGN as usize) as u64;
    frames * 1000 / SAMPLE_RATE as u64
}
