//! Lossless ALPC path: predictor analysis, residual entropy coding, and the
//! exact integer reconstruction.

pub mod decoder;
pub mod encoder;
pub mod lpc;

pub use decoder::Decoder;
pub use encoder::Encoder;
