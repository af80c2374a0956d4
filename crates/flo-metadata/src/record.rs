//! The metadata record: ID3v2.4-equivalent fields plus flo-specific
//! extensions, serialized as a MessagePack string-keyed map.
//!
//! Unknown keys survive round trips: anything not matched by a typed field
//! lands in the flattened `extra` map and is written back verbatim. All
//! maps are ordered so serialization is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

// ── Tag enums ──────────────────────────────────────────────────────────────

/// Attached-picture kind (the ID3v2.4 APIC picture types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PictureKind {
    Other,
    FileIcon,
    OtherFileIcon,
    #[default]
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    VideoScreenCapture,
    BrightColouredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
}

/// Track-structure section kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Intro,
    Verse,
    PreChorus,
    Chorus,
    PostChorus,
    Bridge,
    Breakdown,
    Drop,
    Buildup,
    Solo,
    Instrumental,
    Outro,
    Silence,
    Other,
}

/// What a synchronized-lyrics stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncedContentKind {
    Other,
    #[default]
    Lyrics,
    TextTranscription,
    PartName,
    Events,
    Chord,
    Trivia,
    WebpageUrl,
    ImageUrl,
}

/// Alternative cover-art variant kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverVariantKind {
    Standard,
    Explicit,
    Clean,
    Remix,
    Deluxe,
    Limited,
    Vinyl,
    Cassette,
    Digital,
    Other,
}

// ── Compound values ────────────────────────────────────────────────────────

/// An attached picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    pub mime_type: String,
    pub picture_type: PictureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// A comment with optional language and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub text: String,
}

/// Unsynchronized lyrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub text: String,
}

/// One timestamped line of synchronized lyrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedLine {
    pub timestamp_ms: u64,
    pub text: String,
}

/// Synchronized lyrics with timestamped lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedLyrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub content_type: SyncedContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lines: Vec<SyncedLine>,
}

/// User-defined text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserText {
    pub description: String,
    pub value: String,
}

/// User-defined URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUrl {
    pub description: String,
    pub url: String,
}

/// Rating and play statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popularimeter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_count: Option<u64>,
}

/// Pre-computed waveform peaks for instant visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformData {
    pub peaks_per_second: u32,
    pub peaks: Vec<f32>,
    #[serde(default = "one")]
    pub channels: u8,
}

fn one() -> u8 {
    1
}

/// A section marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMarker {
    pub timestamp_ms: u64,
    pub section_type: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One point of a tempo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpmChange {
    pub timestamp_ms: u64,
    pub bpm: f32,
}

/// A key change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    pub timestamp_ms: u64,
    pub key: String,
}

/// One point of a loudness profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudnessPoint {
    pub timestamp_ms: u64,
    pub lufs: f32,
}

/// A producer/creator note, optionally anchored in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    pub text: String,
}

/// A collaboration credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationCredit {
    pub role: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

/// One step of a remix/sample lineage chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixChainEntry {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    /// "original", "remix", "sample", "cover" or "mashup".
    pub relationship: String,
}

/// Animated cover art.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatedCover {
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u32>,
}

/// An alternative cover-art variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverVariant {
    pub variant_type: CoverVariantKind,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── The record ─────────────────────────────────────────────────────────────

/// The flo metadata record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloMetadata {
    // Identification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,

    // Involved persons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remixer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyricist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_lyricist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub involved_people: Option<Vec<(String, String)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musician_credits: Option<Vec<(String, String)>>,

    // Properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_ms: Option<u64>,

    // Dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_release_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagging_time: Option<String>,

    // Rights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_notice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_station_owner: Option<String>,

    // Sort order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_sort: Option<String>,

    // Other text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_delay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_settings: Option<String>,

    // URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_commercial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_audio_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_audio_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_radio_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_payment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_urls: Vec<UserUrl>,

    // Complex frames
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lyrics: Vec<Lyrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synced_lyrics: Vec<SyncedLyrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pictures: Vec<Picture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_text: Vec<UserText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularimeter: Option<Popularimeter>,

    // Visualization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform_data: Option<WaveformData>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_bytes")]
    pub spectrum_fingerprint: Option<Vec<u8>>,

    // Timing and analysis
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bpm_map: Vec<BpmChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_changes: Vec<KeyChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loudness_profile: Vec<LoudnessPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_loudness_lufs: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness_range_lu: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_peak_dbtp: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_markers: Vec<SectionMarker>,

    // Creator info
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creator_notes: Vec<CreatorNote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collaboration_credits: Vec<CollaborationCredit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remix_chain: Vec<RemixChainEntry>,

    // Covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated_cover: Option<AnimatedCover>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cover_variants: Vec<CoverVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_signature: Option<Picture>,

    // Encoder provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flo_encoder_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,

    /// Free-form string extensions under caller-chosen keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,

    /// Unrecognized top-level keys, preserved verbatim across round trips.
    /// Handled outside the derive: [`FloMetadata::to_msgpack`] appends these
    /// to the serialized map and [`FloMetadata::from_msgpack`] collects
    /// whatever the typed fields did not claim.
    #[serde(skip)]
    pub extra: BTreeMap<String, rmpv::Value>,
}

impl FloMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with just the common identification fields set.
    pub fn with_basic(
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    ) -> Self {
        Self {
            title,
            artist,
            album,
            ..Default::default()
        }
    }

    /// Serialize to a MessagePack string-keyed map, appending the preserved
    /// unrecognized keys after the typed fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        let typed = rmp_serde::to_vec_named(self)?;
        if self.extra.is_empty() {
            return Ok(typed);
        }

        let mut value = rmpv::decode::read_value(&mut typed.as_slice())?;
        let rmpv::Value::Map(entries) = &mut value else {
            return Err(crate::error::MetadataError::Serialize(
                "record did not serialize as a map".into(),
            ));
        };
        for (key, val) in &self.extra {
            entries.push((rmpv::Value::String(key.clone().into()), val.clone()));
        }

        let mut out = Vec::with_capacity(typed.len() + 16);
        rmpv::encode::write_value(&mut out, &value)
            .map_err(|e| crate::error::MetadataError::Serialize(e.to_string()))?;
        Ok(out)
    }

    /// Deserialize from MessagePack bytes, keeping any keys the typed
    /// fields do not recognize.
    pub fn from_msgpack(data: &[u8]) -> Result<Self> {
        let mut meta: FloMetadata = rmp_serde::from_slice(data)?;

        let rmpv::Value::Map(input_entries) = rmpv::decode::read_value(&mut &data[..])? else {
            return Err(crate::error::MetadataError::Parse(
                "metadata is not a map".into(),
            ));
        };

        // Whatever the typed view serializes back is recognized; everything
        // else in the input is an extension key.
        let typed = rmp_serde::to_vec_named(&meta)?;
        let known: std::collections::BTreeSet<String> =
            match rmpv::decode::read_value(&mut typed.as_slice())? {
                rmpv::Value::Map(entries) => entries
                    .into_iter()
                    .filter_map(|(k, _)| k.as_str().map(str::to_string))
                    .collect(),
                _ => Default::default(),
            };

        for (key, val) in input_entries {
            if let Some(name) = key.as_str() {
                if !known.contains(name) {
                    meta.extra.insert(name.to_string(), val);
                }
            }
        }
        Ok(meta)
    }

    /// Whether no meaningful field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The front cover, or any picture when no front cover is attached.
    pub fn cover(&self) -> Option<&Picture> {
        self.pictures
            .iter()
            .find(|p| p.picture_type == PictureKind::CoverFront)
            .or_else(|| self.pictures.first())
    }

    pub fn add_picture(&mut self, mime_type: &str, picture_type: PictureKind, data: Vec<u8>) {
        self.pictures.push(Picture {
            mime_type: mime_type.to_string(),
            picture_type,
            description: None,
            data,
        });
    }

    pub fn add_comment(&mut self, text: &str, language: Option<&str>) {
        self.comments.push(Comment {
            language: language.map(str::to_string),
            description: None,
            text: text.to_string(),
        });
    }

    pub fn add_section(&mut self, timestamp_ms: u64, section_type: SectionKind, label: Option<&str>) {
        self.section_markers.push(SectionMarker {
            timestamp_ms,
            section_type,
            label: label.map(str::to_string),
        });
    }

    pub fn set_custom(&mut self, key: &str, value: &str) {
        self.custom.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(FloMetadata::new().is_empty());
        assert!(!FloMetadata::with_basic(Some("t".into()), None, None).is_empty());
    }

    #[test]
    fn msgpack_round_trip_basic_fields() {
        let mut meta = FloMetadata::with_basic(
            Some("Sweep".into()),
            Some("Test".into()),
            Some("Fixtures".into()),
        );
        meta.bpm = Some(120);
        meta.key = Some("Am".into());
        meta.track_number = Some(3);
        meta.integrated_loudness_lufs = Some(-14.2);

        let bytes = meta.to_msgpack().unwrap();
        let back = FloMetadata::from_msgpack(&bytes).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn msgpack_round_trip_complex_fields() {
        let mut meta = FloMetadata::new();
        meta.add_picture("image/png", PictureKind::CoverFront, vec![0x89, 0x50, 0x4E]);
        meta.add_comment("first take", Some("eng"));
        meta.synced_lyrics.push(SyncedLyrics {
            language: Some("eng".into()),
            content_type: SyncedContentKind::Lyrics,
            description: None,
            lines: vec![
                SyncedLine {
                    timestamp_ms: 0,
                    text: "line one".into(),
                },
                SyncedLine {
                    timestamp_ms: 2500,
                    text: "line two".into(),
                },
            ],
        });
        meta.waveform_data = Some(WaveformData {
            peaks_per_second: 50,
            peaks: vec![0.1, 0.9, 0.4],
            channels: 1,
        });
        meta.bpm_map.push(BpmChange {
            timestamp_ms: 0,
            bpm: 128.0,
        });
        meta.remix_chain.push(RemixChainEntry {
            title: "Origin".into(),
            artist: "Someone".into(),
            year: Some(1998),
            isrc: None,
            relationship: "sample".into(),
        });
        meta.cover_variants.push(CoverVariant {
            variant_type: CoverVariantKind::Vinyl,
            mime_type: "image/jpeg".into(),
            data: vec![1, 2, 3],
            description: Some("vinyl sleeve".into()),
        });

        let bytes = meta.to_msgpack().unwrap();
        let back = FloMetadata::from_msgpack(&bytes).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn unknown_keys_survive() {
        let mut meta = FloMetadata::with_basic(Some("Known".into()), None, None);
        meta.extra.insert(
            "experimental_field".into(),
            rmpv::Value::String("kept".into()),
        );
        meta.extra
            .insert("some_number".into(), rmpv::Value::from(42));

        let bytes = meta.to_msgpack().unwrap();
        let back = FloMetadata::from_msgpack(&bytes).unwrap();
        assert_eq!(back.extra.len(), 2);
        assert_eq!(
            back.extra.get("experimental_field"),
            Some(&rmpv::Value::String("kept".into()))
        );
        assert_eq!(back, meta);
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut meta = FloMetadata::new();
        meta.set_custom("zeta", "1");
        meta.set_custom("alpha", "2");
        meta.extra.insert("zz".into(), rmpv::Value::from(1));
        meta.extra.insert("aa".into(), rmpv::Value::from(2));
        assert_eq!(meta.to_msgpack().unwrap(), meta.to_msgpack().unwrap());
    }

    #[test]
    fn cover_prefers_front() {
        let mut meta = FloMetadata::new();
        meta.add_picture("image/png", PictureKind::BandLogo, vec![1]);
        meta.add_picture("image/png", PictureKind::CoverFront, vec![2]);
        assert_eq!(meta.cover().unwrap().data, vec![2]);
    }
}
