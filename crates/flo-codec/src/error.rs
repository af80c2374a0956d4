//! Error types for the flo codec crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding flo audio.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] flo_format::FormatError),

    #[error("unsupported parameter: {detail}")]
    UnsupportedParameter { detail: String },

    #[error("residual bitstream truncated: {detail}")]
    TruncatedBitstream { detail: String },

    #[error("predictor unstable: {detail}")]
    PredictorUnstable { detail: String },

    #[error("transform stream invalid: {detail}")]
    TransformOverflow { detail: String },
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Check the audio parameters accepted by every public entry point:
/// channels 1 or 2, bit depth 16/24/32, sample rate 8 kHz - 192 kHz.
pub fn check_params(sample_rate: u32, channels: u8, bit_depth: u8) -> Result<()> {
    if !(8_000..=192_000).contains(&sample_rate) {
        return Err(CodecError::UnsupportedParameter {
            detail: format!("sample rate {sample_rate} outside 8000..=192000"),
        });
    }
    if !(1..=2).contains(&channels) {
        return Err(CodecError::UnsupportedParameter {
            detail: format!("channels must be 1 or 2, got {channels}"),
        });
    }
    if !matches!(bit_depth, 16 | 24 | 32) {
        return Err(CodecError::UnsupportedParameter {
            detail: format!("bit depth must be 16, 24 or 32, got {bit_depth}"),
        });
    }
    Ok(())
}
