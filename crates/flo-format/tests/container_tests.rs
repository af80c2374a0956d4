//! Integration tests for the flo container: structural invariants, error
//! paths, and CRC behavior on hand-corrupted files.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use flo_format::{
    compute_crc32, ChannelPayload, FormatError, Frame, FrameType, Reader, ResidualEncoding,
    Writer, HEADER_SIZE, MAGIC,
};

fn sample_frames() -> Vec<Frame> {
    let mut alpc = Frame::new(FrameType::Alpc(4), 44_100);
    alpc.channels.push(ChannelPayload::Alpc {
        coeffs: vec![100, -200, 300, -400],
        shift_bits: 14,
        residual_encoding: ResidualEncoding::Rice,
        rice_parameter: 5,
        residuals: vec![0xAA; 32],
    });

    let mut raw = Frame::new(FrameType::Raw, 44_100);
    raw.channels.push(ChannelPayload::Raw {
        samples: vec![0x7F; 64],
    });

    let mut silence = Frame::new(FrameType::Silence, 10_000);
    silence.channels.push(ChannelPayload::Silence);

    vec![alpc, raw, silence]
}

fn sample_file() -> Vec<u8> {
    Writer::new(44_100, 1, 16)
        .with_compression_level(7)
        .finalize(&sample_frames(), b"\x81\xa5title\xa4test")
        .unwrap()
}

#[test]
fn full_round_trip() {
    let bytes = sample_file();
    let file = Reader::new().read(&bytes).unwrap();

    assert_eq!(file.header.sample_rate, 44_100);
    assert_eq!(file.header.channels, 1);
    assert_eq!(file.header.compression_level, 7);
    assert_eq!(file.header.total_frames, 3);
    assert_eq!(file.frames, sample_frames());
    assert_eq!(file.metadata, b"\x81\xa5title\xa4test");
    assert!(file.extra.is_empty());
}

#[test]
fn toc_partitions_data_exactly() {
    let bytes = sample_file();
    let file = Reader::new().read(&bytes).unwrap();

    let mut expected_offset = 0u64;
    for (i, entry) in file.toc.iter().enumerate() {
        assert_eq!(entry.frame_index as usize, i);
        assert_eq!(entry.byte_offset, expected_offset);
        expected_offset += u64::from(entry.frame_size);
    }
    assert_eq!(expected_offset, file.header.data_size);
}

#[test]
fn bad_magic_rejected() {
    let mut bytes = sample_file();
    bytes[0] = b'X';
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(FormatError::BadMagic)
    ));
}

#[test]
fn unsupported_major_version_rejected() {
    let mut bytes = sample_file();
    bytes[4] = 9;
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(FormatError::UnsupportedVersion { major: 9, .. })
    ));
}

#[test]
fn truncated_file_rejected() {
    let bytes = sample_file();
    let cut = &bytes[..bytes.len() - 5];
    assert!(matches!(
        Reader::new().read(cut),
        Err(FormatError::SizeInconsistent { .. })
    ));
}

#[test]
fn tiny_file_is_truncated_header() {
    assert!(matches!(
        Reader::new().read(&[0x46, 0x4C]),
        Err(FormatError::TruncatedChunk { chunk: "header", .. })
    ));
}

#[test]
fn non_monotonic_toc_rejected() {
    let bytes = sample_file();
    let toc_start = 4 + HEADER_SIZE as usize;
    // Swap the frame_index fields of entries 0 and 1.
    let mut corrupted = bytes.clone();
    let e0 = toc_start + 4;
    let e1 = toc_start + 4 + 20;
    corrupted[e0..e0 + 4].copy_from_slice(&1u32.to_le_bytes());
    corrupted[e1..e1 + 4].copy_from_slice(&0u32.to_le_bytes());
    assert!(matches!(
        Reader::new().read(&corrupted),
        Err(FormatError::CorruptToc { .. })
    ));
}

#[test]
fn crc_valid_on_written_file() {
    let bytes = sample_file();
    assert!(Reader::new().verify_crc(&bytes).is_ok());
}

#[test]
fn every_data_byte_is_crc_protected() {
    let bytes = sample_file();
    let header = Reader::new().read_header(&bytes).unwrap();
    let start = header.data_offset() as usize;
    let end = start + header.data_size as usize;

    for at in start..end {
        let mut flipped = bytes.clone();
        flipped[at] ^= 0xFF;
        assert!(
            matches!(
                Reader::new().verify_crc(&flipped),
                Err(FormatError::CrcMismatch { .. })
            ),
            "flip at {at} went undetected"
        );
    }
}

#[test]
fn crc_failure_does_not_block_read() {
    let bytes = sample_file();
    let header = Reader::new().read_header(&bytes).unwrap();
    // Flip a byte inside the raw frame's PCM payload; the structure still
    // parses, only the CRC notices.
    let raw_payload_at = sample_frames()[0].byte_len() + 6 + 4 + 5;
    let at = header.data_offset() as usize + raw_payload_at;
    let mut flipped = bytes.clone();
    flipped[at] ^= 0x01;

    assert!(Reader::new().read(&flipped).is_ok());
    assert!(Reader::new().verify_crc(&flipped).is_err());
}

#[test]
fn unknown_frame_type_reported() {
    let mut frame_bytes = Vec::new();
    frame_bytes.write_u8(200).unwrap(); // reserved tag
    frame_bytes.write_u32::<LittleEndian>(100).unwrap();
    frame_bytes.write_u8(0).unwrap();
    frame_bytes.write_u32::<LittleEndian>(0).unwrap();

    let mut bytes = Vec::new();
    bytes.write_all(&MAGIC).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u16::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(44_100).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u8(16).unwrap();
    bytes.write_u64::<LittleEndian>(1).unwrap();
    bytes.write_u8(5).unwrap();
    bytes.write_all(&[0; 3]).unwrap();
    bytes
        .write_u32::<LittleEndian>(compute_crc32(&frame_bytes))
        .unwrap();
    bytes.write_u64::<LittleEndian>(HEADER_SIZE).unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap(); // no TOC
    bytes
        .write_u64::<LittleEndian>(frame_bytes.len() as u64)
        .unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap();
    bytes.write_all(&frame_bytes).unwrap();

    assert!(matches!(
        Reader::new().read(&bytes),
        Err(FormatError::UnknownFrameType(200))
    ));
}

#[test]
fn channel_size_beyond_frame_rejected() {
    let mut frame_bytes = Vec::new();
    frame_bytes.write_u8(254).unwrap(); // raw frame
    frame_bytes.write_u32::<LittleEndian>(4).unwrap();
    frame_bytes.write_u8(0).unwrap();
    frame_bytes.write_u32::<LittleEndian>(1_000).unwrap(); // lies about size
    frame_bytes.write_all(&[0u8; 8]).unwrap();

    let mut bytes = Vec::new();
    bytes.write_all(&MAGIC).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u16::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(44_100).unwrap();
    bytes.write_u8(1).unwrap();
    bytes.write_u8(16).unwrap();
    bytes.write_u64::<LittleEndian>(1).unwrap();
    bytes.write_u8(5).unwrap();
    bytes.write_all(&[0; 3]).unwrap();
    bytes
        .write_u32::<LittleEndian>(compute_crc32(&frame_bytes))
        .unwrap();
    bytes.write_u64::<LittleEndian>(HEADER_SIZE).unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap();
    bytes
        .write_u64::<LittleEndian>(frame_bytes.len() as u64)
        .unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap();
    bytes.write_u64::<LittleEndian>(0).unwrap();
    bytes.write_all(&frame_bytes).unwrap();

    assert!(matches!(
        Reader::new().read(&bytes),
        Err(FormatError::ChannelSizeMismatch { .. })
    ));
}

#[test]
fn empty_metadata_means_zero_meta_size() {
    let bytes = Writer::new(8_000, 1, 16)
        .finalize(&sample_frames(), &[])
        .unwrap();
    let header = Reader::new().read_header(&bytes).unwrap();
    assert_eq!(header.meta_size, 0);
    assert_eq!(header.expected_file_len(), bytes.len() as u64);
}
