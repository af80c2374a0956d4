//! # flo-stream
//!
//! Incremental codecs for flo files: a [`StreamingDecoder`] that accepts
//! bytes as they arrive and emits PCM frame by frame, and a
//! [`StreamingEncoder`] that accepts PCM as it is captured and emits
//! encoded frames.
//!
//! ```
//! use flo_stream::StreamingDecoder;
//! # let pcm: Vec<f32> = (0..44_100).map(|i| (i as f32 * 0.03).sin() * 0.5).collect();
//! # let file = flo_codec::encode_lossless(&pcm, 44_100, 1, 16, 5, None).unwrap();
//!
//! let mut decoder = StreamingDecoder::new();
//! for chunk in file.chunks(7) {
//!     decoder.feed(chunk).unwrap();
//! }
//! assert!(decoder.get_info().is_some());
//! let samples = decoder.decode_available().unwrap();
//! assert_eq!(samples.len(), 44_100);
//! ```

pub mod decoder;
pub mod encoder;

pub use decoder::{DecoderState, StreamInfo, StreamingDecoder};
pub use encoder::{EncodedFrame, StreamingEncoder};
