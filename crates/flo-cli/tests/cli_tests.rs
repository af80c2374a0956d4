//! Integration tests for the `flo` binary: encode -> info -> metadata ->
//! decode round trips over generated WAV fixtures, plus the documented exit
//! codes.

use std::f32::consts::PI;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ──────────────────────── helpers ────────────────────────

fn generate_sine(sample_rate: u32, frequency: f32, duration_secs: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * PI * frequency * t).sin() * 0.8
        })
        .collect()
}

fn write_wav_i16(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create WAV");
    for &s in samples {
        let v = (f64::from(s) * 32_768.0).clamp(-32_768.0, 32_767.0) as i16;
        writer.write_sample(v).expect("write sample");
    }
    writer.finalize().expect("finalize WAV");
}

fn read_wav_i16(path: &Path) -> Vec<i16> {
    hound::WavReader::open(path)
        .expect("open WAV")
        .into_samples::<i16>()
        .map(|s| s.expect("read sample"))
        .collect()
}

fn flo_cmd() -> Command {
    Command::cargo_bin("flo").expect("flo binary")
}

// ──────────────────────── tests ─────────────────────────

#[test]
fn lossless_round_trip_is_bit_exact() {
    let tmp = TempDir::new().unwrap();
    let wav_path = tmp.path().join("tone.wav");
    let flo_path = tmp.path().join("tone.flo");
    let out_path = tmp.path().join("restored.wav");

    let samples = generate_sine(44_100, 440.0, 1.5);
    write_wav_i16(&wav_path, &samples, 44_100);
    let original = read_wav_i16(&wav_path);

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            flo_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("lossless"))
        .stdout(predicate::str::contains("done"));

    flo_cmd()
        .args([
            "decode",
            flo_path.to_str().unwrap(),
            "-o",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));

    let restored = read_wav_i16(&out_path);
    assert_eq!(restored, original, "lossless round trip must be bit exact");
}

#[test]
fn info_reports_stream_facts() {
    let tmp = TempDir::new().unwrap();
    let wav_path = tmp.path().join("tone.wav");
    let flo_path = tmp.path().join("tone.flo");
    write_wav_i16(&wav_path, &generate_sine(44_100, 440.0, 2.0), 44_100);

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            flo_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    flo_cmd()
        .args(["info", flo_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("FLO! (0x464C4F21)"))
        .stdout(predicate::str::contains("44100 Hz"))
        .stdout(predicate::str::contains("lossless"))
        .stdout(predicate::str::contains("crc32:     valid"));

    flo_cmd()
        .args(["info", flo_path.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sample_rate\": 44100"))
        .stdout(predicate::str::contains("\"is_lossy\": false"))
        .stdout(predicate::str::contains("\"crc_valid\": true"));
}

#[test]
fn lossy_preset_encoding_shrinks_file() {
    let tmp = TempDir::new().unwrap();
    let wav_path = tmp.path().join("tone.wav");
    let lossless_path = tmp.path().join("a.flo");
    let lossy_path = tmp.path().join("b.flo");
    write_wav_i16(&wav_path, &generate_sine(44_100, 440.0, 2.0), 44_100);

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            lossless_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            lossy_path.to_str().unwrap(),
            "--preset",
            "medium",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("lossy"));

    let lossless_size = std::fs::metadata(&lossless_path).unwrap().len();
    let lossy_size = std::fs::metadata(&lossy_path).unwrap().len();
    assert!(
        lossy_size < lossless_size,
        "lossy {lossy_size} not smaller than lossless {lossless_size}"
    );

    flo_cmd()
        .args(["info", lossy_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("lossy"));
}

#[test]
fn metadata_set_show_strip() {
    let tmp = TempDir::new().unwrap();
    let wav_path = tmp.path().join("tone.wav");
    let flo_path = tmp.path().join("tone.flo");
    let tagged_path = tmp.path().join("tagged.flo");
    let bare_path = tmp.path().join("bare.flo");
    write_wav_i16(&wav_path, &generate_sine(44_100, 440.0, 0.5), 44_100);

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            flo_path.to_str().unwrap(),
            "--title",
            "Original",
        ])
        .assert()
        .success();

    flo_cmd()
        .args([
            "metadata",
            flo_path.to_str().unwrap(),
            "-o",
            tagged_path.to_str().unwrap(),
            "--set-title",
            "Sweep",
            "--set-artist",
            "Test",
            "--set-bpm",
            "120",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("metadata updated"));

    flo_cmd()
        .args(["metadata", tagged_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sweep"))
        .stdout(predicate::str::contains("Test"))
        .stdout(predicate::str::contains("120"));

    // The audio is untouched by metadata edits.
    flo_cmd()
        .args(["validate", tagged_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CRC32 valid"));

    flo_cmd()
        .args([
            "metadata",
            tagged_path.to_str().unwrap(),
            "-o",
            bare_path.to_str().unwrap(),
            "--strip",
        ])
        .assert()
        .success();

    flo_cmd()
        .args(["metadata", bare_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("no metadata"));
}

#[test]
fn missing_input_exits_3() {
    flo_cmd()
        .args(["info", "/nonexistent/file.flo"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn non_wav_input_exits_4() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("not_audio.wav");
    std::fs::write(&bogus, b"definitely not a wav file").unwrap();

    flo_cmd()
        .args([
            "encode",
            bogus.to_str().unwrap(),
            "-o",
            tmp.path().join("out.flo").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn corrupt_flo_decode_exits_6() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("broken.flo");
    std::fs::write(&bogus, b"FLO!garbagegarbagegarbage").unwrap();

    flo_cmd()
        .args([
            "decode",
            bogus.to_str().unwrap(),
            "-o",
            tmp.path().join("out.wav").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(6);
}

#[test]
fn corrupted_data_fails_validate() {
    let tmp = TempDir::new().unwrap();
    let wav_path = tmp.path().join("tone.wav");
    let flo_path = tmp.path().join("tone.flo");
    write_wav_i16(&wav_path, &generate_sine(44_100, 440.0, 0.5), 44_100);

    flo_cmd()
        .args([
            "encode",
            wav_path.to_str().unwrap(),
            "-o",
            flo_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    // Flip a byte near the end of DATA (before META).
    let mut bytes = std::fs::read(&flo_path).unwrap();
    let flip_at = bytes.len() / 2;
    bytes[flip_at] ^= 0xFF;
    std::fs::write(&flo_path, &bytes).unwrap();

    flo_cmd()
        .args(["validate", flo_path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn bad_arguments_exit_2() {
    flo_cmd()
        .args(["encode", "--nonsense"])
        .assert()
        .failure()
        .code(2);
}
