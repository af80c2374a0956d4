//! flo CLI — encode, decode and inspect `.flo` files.
//!
//! # Usage
//!
//! ```bash
//! flo encode input.wav -o track.flo --level 7
//! flo encode input.wav -o track.flo --preset high --title "Track"
//! flo encode input.wav -o track.flo --bitrate 128
//! flo decode track.flo -o restored.wav
//! flo info track.flo --json
//! flo metadata track.flo --set-title "New Title" -o tagged.flo
//! flo metadata track.flo --strip -o bare.flo
//! flo validate track.flo
//! ```
//!
//! Exit codes: 0 ok, 1 general failure, 2 argument errors, 3 input not
//! found, 4 unsupported input, 5 encode error, 6 decode error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use flo_codec::{CodecError, QualityPreset};
use flo_metadata::{FloMetadata, WaveformData};

const EXIT_GENERAL: u8 = 1;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_UNSUPPORTED: u8 = 4;
const EXIT_ENCODE: u8 = 5;
const EXIT_DECODE: u8 = 6;

// ───────────────────────────── CLI definition ─────────────────────────────

/// Top-level entry point for the `flo` binary.
#[derive(Parser)]
#[command(
    name = "flo",
    about = "flo audio codec -- lossless ALPC and perceptual MDCT compression",
    version
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a WAV file into a .flo container.
    Encode {
        /// Input WAV file path.
        input: PathBuf,

        /// Output .flo file path.
        #[arg(short, long)]
        output: PathBuf,

        /// Lossy quality in [0, 1]. Selecting any lossy option switches to
        /// the transform coder; the default is lossless.
        #[arg(short, long, conflicts_with_all = ["preset", "bitrate"])]
        quality: Option<f32>,

        /// Lossy quality preset (low, medium, high, veryhigh, transparent).
        #[arg(short, long, conflicts_with = "bitrate")]
        preset: Option<String>,

        /// Target bitrate in kbps (lossy).
        #[arg(short, long)]
        bitrate: Option<u32>,

        /// Lossless compression level 0-9.
        #[arg(short, long, default_value_t = 5)]
        level: u8,

        /// Track title to embed.
        #[arg(long)]
        title: Option<String>,

        /// Artist to embed.
        #[arg(long)]
        artist: Option<String>,

        /// Album to embed.
        #[arg(long)]
        album: Option<String>,

        /// Skip waveform-peak analysis metadata.
        #[arg(long)]
        no_analysis: bool,
    },

    /// Decode a .flo file back to WAV.
    Decode {
        /// Input .flo file path.
        input: PathBuf,

        /// Output WAV file path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show information about a .flo file.
    Info {
        /// Input .flo file path.
        input: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the metadata of a .flo file.
    Metadata {
        /// Input .flo file path.
        input: PathBuf,

        /// Output path for edits. If omitted, the input is overwritten.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Set the track title.
        #[arg(long)]
        set_title: Option<String>,

        /// Set the artist.
        #[arg(long)]
        set_artist: Option<String>,

        /// Set the album.
        #[arg(long)]
        set_album: Option<String>,

        /// Set the BPM.
        #[arg(long)]
        set_bpm: Option<u32>,

        /// Set the musical key (e.g. "Am").
        #[arg(long)]
        set_key: Option<String>,

        /// Remove all metadata.
        #[arg(long, conflicts_with_all = ["set_title", "set_artist", "set_album", "set_bpm", "set_key"])]
        strip: bool,

        /// Show metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check the DATA CRC32 of a .flo file.
    Validate {
        /// Input .flo file path.
        input: PathBuf,
    },
}

// ────────────────────────────── main ──────────────────────────────

/// A failure with the exit code it maps to.
struct CliError {
    code: u8,
    source: anyhow::Error,
}

impl CliError {
    fn new(code: u8, source: anyhow::Error) -> Self {
        Self { code, source }
    }
}

trait ExitContext<T> {
    /// Attach the exit code this error class maps to.
    fn exit_code(self, code: u8) -> Result<T, CliError>;
}

impl<T, E: Into<anyhow::Error>> ExitContext<T> for Result<T, E> {
    fn exit_code(self, code: u8) -> Result<T, CliError> {
        self.map_err(|e| CliError::new(code, e.into()))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err.source);
            ExitCode::from(err.code)
        }
    }
}

/// Map codec errors to exit codes: parameter problems are "unsupported
/// input", everything else is the given default.
fn map_codec_error(default_code: u8) -> impl Fn(CodecError) -> CliError {
    move |e| {
        let code = match &e {
            CodecError::UnsupportedParameter { .. } => EXIT_UNSUPPORTED,
            _ => default_code,
        };
        CliError::new(code, e.into())
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Encode {
            input,
            output,
            quality,
            preset,
            bitrate,
            level,
            title,
            artist,
            album,
            no_analysis,
        } => cmd_encode(
            &input, &output, quality, preset, bitrate, level, title, artist, album, no_analysis,
        ),
        Commands::Decode { input, output } => cmd_decode(&input, &output),
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Metadata {
            input,
            output,
            set_title,
            set_artist,
            set_album,
            set_bpm,
            set_key,
            strip,
            json,
        } => cmd_metadata(
            &input, output.as_deref(), set_title, set_artist, set_album, set_bpm, set_key, strip,
            json,
        ),
        Commands::Validate { input } => cmd_validate(&input),
    }
}

// ──────────────────────────── encode ──────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_encode(
    input: &Path,
    output: &Path,
    quality: Option<f32>,
    preset: Option<String>,
    bitrate: Option<u32>,
    level: u8,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    no_analysis: bool,
) -> Result<(), CliError> {
    let wav = read_wav(input)?;

    let mut meta = FloMetadata::with_basic(title, artist, album);
    meta.source_format = Some("WAV".to_string());
    if !no_analysis {
        let peaks = flo_codec::extract_waveform_peaks(&wav.samples, wav.channels, wav.sample_rate, 50);
        meta.waveform_data = Some(WaveformData {
            peaks_per_second: peaks.peaks_per_second,
            peaks: peaks.peaks,
            channels: peaks.channels,
        });
    }
    let meta_bytes = meta
        .to_msgpack()
        .context("failed to serialize metadata")
        .exit_code(EXIT_ENCODE)?;

    let mode_quality = match (&preset, quality, bitrate) {
        (Some(name), _, _) => Some(parse_preset(name)?.as_f32()),
        (None, Some(q), _) => {
            if !(0.0..=1.0).contains(&q) {
                return Err(CliError::new(
                    EXIT_UNSUPPORTED,
                    anyhow!("quality {q} outside [0, 1]"),
                ));
            }
            Some(q)
        }
        (None, None, Some(kbps)) => Some(flo_codec::quality_for_bitrate(
            kbps,
            wav.sample_rate,
            wav.channels,
        )),
        (None, None, None) => None,
    };

    let encoded = match mode_quality {
        Some(q) => flo_codec::encode_lossy(
            &wav.samples,
            wav.sample_rate,
            wav.channels,
            wav.bit_depth,
            q,
            Some(&meta_bytes),
        ),
        None => flo_codec::encode_lossless(
            &wav.samples,
            wav.sample_rate,
            wav.channels,
            wav.bit_depth,
            level,
            Some(&meta_bytes),
        ),
    }
    .map_err(map_codec_error(EXIT_ENCODE))?;

    std::fs::write(output, &encoded)
        .with_context(|| format!("failed to write {}", output.display()))
        .exit_code(EXIT_GENERAL)?;

    let raw_size = wav.samples.len() * usize::from(wav.bit_depth) / 8;
    println!("flo encoder");
    println!("  input:   {} ({} Hz, {} ch)", input.display(), wav.sample_rate, wav.channels);
    println!(
        "  mode:    {}",
        match mode_quality {
            Some(q) => format!("lossy, quality {q:.2}"),
            None => format!("lossless, level {level}"),
        }
    );
    println!(
        "  output:  {} ({} bytes, {:.2}x compression)",
        output.display(),
        encoded.len(),
        raw_size as f64 / encoded.len() as f64
    );
    println!("done");
    Ok(())
}

fn parse_preset(name: &str) -> Result<QualityPreset, CliError> {
    match name.to_ascii_lowercase().as_str() {
        "low" => Ok(QualityPreset::Low),
        "medium" => Ok(QualityPreset::Medium),
        "high" => Ok(QualityPreset::High),
        "veryhigh" | "very-high" => Ok(QualityPreset::VeryHigh),
        "transparent" => Ok(QualityPreset::Transparent),
        other => Err(CliError::new(
            EXIT_UNSUPPORTED,
            anyhow!("unknown preset '{other}' (low, medium, high, veryhigh, transparent)"),
        )),
    }
}

// ──────────────────────────── decode ──────────────────────────────

fn cmd_decode(input: &Path, output: &Path) -> Result<(), CliError> {
    let data = read_input_file(input)?;
    let decoded = flo_codec::decode(&data).map_err(map_codec_error(EXIT_DECODE))?;
    let file_info = flo_codec::info(&data).map_err(map_codec_error(EXIT_DECODE))?;

    write_wav(output, &decoded.pcm, decoded.sample_rate, decoded.channels, file_info.bit_depth)?;

    println!("flo decoder");
    println!(
        "  decoded {} samples ({} Hz, {} ch) to {}",
        decoded.total_samples,
        decoded.sample_rate,
        decoded.channels,
        output.display()
    );
    println!("done");
    Ok(())
}

// ───────────────────────────── info ───────────────────────────────

fn cmd_info(input: &Path, json: bool) -> Result<(), CliError> {
    let data = read_input_file(input)?;
    let info = flo_codec::info(&data).map_err(map_codec_error(EXIT_DECODE))?;

    if json {
        let value = serde_json::json!({
            "version": info.version,
            "sample_rate": info.sample_rate,
            "channels": info.channels,
            "bit_depth": info.bit_depth,
            "total_frames": info.total_frames,
            "total_samples": info.total_samples,
            "duration_secs": info.duration_secs,
            "file_size": info.file_size,
            "compression_ratio": info.compression_ratio,
            "crc_valid": info.crc_valid,
            "is_lossy": info.is_lossy,
            "lossy_quality": info.lossy_quality,
            "has_metadata": flo_metadata::has_metadata(&data),
        });
        println!("{}", serde_json::to_string_pretty(&value).expect("json value serializes"));
        return Ok(());
    }

    println!("flo file information");
    println!("  magic:     FLO! (0x464C4F21)");
    println!("  version:   {}", info.version);
    println!("  rate:      {} Hz", info.sample_rate);
    println!("  channels:  {}", info.channels);
    println!("  depth:     {} bit", info.bit_depth);
    println!("  frames:    {}", info.total_frames);
    println!("  duration:  {:.3} s", info.duration_secs);
    println!(
        "  mode:      {}",
        if info.is_lossy {
            format!("lossy (preset level {})", info.lossy_quality.unwrap_or(0))
        } else {
            "lossless".to_string()
        }
    );
    println!("  size:      {} bytes", info.file_size);
    println!("  ratio:     {:.2}x", info.compression_ratio);
    println!("  crc32:     {}", if info.crc_valid { "valid" } else { "MISMATCH" });
    println!(
        "  metadata:  {}",
        if flo_metadata::has_metadata(&data) { "present" } else { "none" }
    );
    Ok(())
}

// ─────────────────────────── metadata ─────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_metadata(
    input: &Path,
    output: Option<&Path>,
    set_title: Option<String>,
    set_artist: Option<String>,
    set_album: Option<String>,
    set_bpm: Option<u32>,
    set_key: Option<String>,
    strip: bool,
    json: bool,
) -> Result<(), CliError> {
    let data = read_input_file(input)?;

    if strip {
        let stripped = flo_metadata::strip_metadata(&data)
            .context("failed to strip metadata")
            .exit_code(EXIT_GENERAL)?;
        let target = output.unwrap_or(input);
        std::fs::write(target, &stripped)
            .with_context(|| format!("failed to write {}", target.display()))
            .exit_code(EXIT_GENERAL)?;
        println!("metadata stripped -> {}", target.display());
        return Ok(());
    }

    let edits = set_title.is_some()
        || set_artist.is_some()
        || set_album.is_some()
        || set_bpm.is_some()
        || set_key.is_some();

    let mut meta = flo_metadata::read_metadata(&data)
        .context("failed to read metadata")
        .exit_code(EXIT_DECODE)?;

    if edits {
        if set_title.is_some() {
            meta.title = set_title;
        }
        if set_artist.is_some() {
            meta.artist = set_artist;
        }
        if set_album.is_some() {
            meta.album = set_album;
        }
        if set_bpm.is_some() {
            meta.bpm = set_bpm;
        }
        if set_key.is_some() {
            meta.key = set_key;
        }

        let updated = flo_metadata::update_metadata(&data, &meta)
            .context("failed to update metadata")
            .exit_code(EXIT_GENERAL)?;
        let target = output.unwrap_or(input);
        std::fs::write(target, &updated)
            .with_context(|| format!("failed to write {}", target.display()))
            .exit_code(EXIT_GENERAL)?;
        println!("metadata updated -> {}", target.display());
        return Ok(());
    }

    // No edits: show.
    if json {
        let value = serde_json::json!({
            "title": meta.title,
            "artist": meta.artist,
            "album": meta.album,
            "genre": meta.genre,
            "bpm": meta.bpm,
            "key": meta.key,
            "year": meta.year,
            "track_number": meta.track_number,
            "comments": meta.comments.len(),
            "pictures": meta.pictures.len(),
            "has_waveform": meta.waveform_data.is_some(),
            "custom_keys": meta.custom.keys().collect::<Vec<_>>(),
            "extra_keys": meta.extra.keys().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value).expect("json value serializes"));
    } else if meta.is_empty() {
        println!("no metadata");
    } else {
        println!("flo metadata");
        let line = |label: &str, value: &Option<String>| {
            if let Some(v) = value {
                println!("  {label:<9}{v}");
            }
        };
        line("title:", &meta.title);
        line("artist:", &meta.artist);
        line("album:", &meta.album);
        line("genre:", &meta.genre);
        line("key:", &meta.key);
        if let Some(bpm) = meta.bpm {
            println!("  bpm:     {bpm}");
        }
        if let Some(year) = meta.year {
            println!("  year:    {year}");
        }
        if !meta.pictures.is_empty() {
            println!("  pictures: {}", meta.pictures.len());
        }
        if meta.waveform_data.is_some() {
            println!("  waveform: present");
        }
    }
    Ok(())
}

// ─────────────────────────── validate ─────────────────────────────

fn cmd_validate(input: &Path) -> Result<(), CliError> {
    let data = read_input_file(input)?;
    if flo_codec::validate(&data) {
        println!("{}: CRC32 valid", input.display());
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_GENERAL,
            anyhow!("{}: CRC32 mismatch or unreadable container", input.display()),
        ))
    }
}

// ──────────────────────────── WAV IO ──────────────────────────────

struct WavAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
}

fn read_input_file(path: &Path) -> Result<Vec<u8>, CliError> {
    if !path.exists() {
        return Err(CliError::new(
            EXIT_NOT_FOUND,
            anyhow!("input file not found: {}", path.display()),
        ));
    }
    std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .exit_code(EXIT_GENERAL)
}

fn read_wav(path: &Path) -> Result<WavAudio, CliError> {
    if !path.exists() {
        return Err(CliError::new(
            EXIT_NOT_FOUND,
            anyhow!("input file not found: {}", path.display()),
        ));
    }

    let reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open WAV {}", path.display()))
        .exit_code(EXIT_UNSUPPORTED)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > 2 {
        return Err(CliError::new(
            EXIT_UNSUPPORTED,
            anyhow!("{} channels not supported (mono or stereo only)", spec.channels),
        ));
    }

    let (samples, bit_depth) = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => {
            let samples: Result<Vec<f32>, _> = reader.into_samples::<f32>().collect();
            (samples.context("bad WAV data").exit_code(EXIT_UNSUPPORTED)?, 32u8)
        }
        (hound::SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            let samples: Result<Vec<f32>, _> = reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect();
            (samples.context("bad WAV data").exit_code(EXIT_UNSUPPORTED)?, bits as u8)
        }
        (format, bits) => {
            return Err(CliError::new(
                EXIT_UNSUPPORTED,
                anyhow!("unsupported WAV format: {bits}-bit {format:?}"),
            ))
        }
    };

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels as u8,
        bit_depth,
    })
}

fn write_wav(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
) -> Result<(), CliError> {
    let write = || -> hound::Result<()> {
        match bit_depth {
            16 => {
                let spec = hound::WavSpec {
                    channels: u16::from(channels),
                    sample_rate,
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                let mut writer = hound::WavWriter::create(path, spec)?;
                for &s in samples {
                    let v = (f64::from(s) * 32_768.0).clamp(-32_768.0, 32_767.0) as i16;
                    writer.write_sample(v)?;
                }
                writer.finalize()
            }
            24 => {
                let spec = hound::WavSpec {
                    channels: u16::from(channels),
                    sample_rate,
                    bits_per_sample: 24,
                    sample_format: hound::SampleFormat::Int,
                };
                let mut writer = hound::WavWriter::create(path, spec)?;
                let scale = f64::from(1 << 23);
                for &s in samples {
                    let v = (f64::from(s) * scale).clamp(-scale, scale - 1.0) as i32;
                    writer.write_sample(v)?;
                }
                writer.finalize()
            }
            _ => {
                let spec = hound::WavSpec {
                    channels: u16::from(channels),
                    sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let mut writer = hound::WavWriter::create(path, spec)?;
                for &s in samples {
                    writer.write_sample(s)?;
                }
                writer.finalize()
            }
        }
    };
    write()
        .with_context(|| format!("failed to write WAV {}", path.display()))
        .exit_code(EXIT_GENERAL)
}
