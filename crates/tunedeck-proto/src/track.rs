use serde::{Deserialize, Serialize};

use crate::lenient;

/// One catalog record. `path` is the identity key: stable and unique across
/// the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, deserialize_with = "lenient::string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub album: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub tracknum: String,
    /// Length in seconds.
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    /// Sample rate in Hz.
    #[serde(
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<u32>,
    /// File size in bytes.
    #[serde(
        default,
        deserialize_with = "lenient::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
}

impl Track {
    /// Track number as an integer, when the tag holds one. Tags like `"3/12"`
    /// yield `3`.
    pub fn track_number(&self) -> Option<u32> {
        self.tracknum
            .split('/')
            .next()
            .and_then(|n| n.trim().parse().ok())
    }

    /// `"Artist - Title"`, falling back to the file path when untagged.
    pub fn display_name(&self) -> String {
        match (self.artist.is_empty(), self.title.is_empty()) {
            (false, false) => format!("{} - {}", self.artist, self.title),
            (true, false) => self.title.clone(),
            _ => self.path.clone(),
        }
    }
}

/// One play-queue element. `queue_id` is the identity key: the same path may
/// be queued more than once, but each entry keeps its id across reorderings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "queueId", default, deserialize_with = "lenient::string")]
    pub queue_id: String,
    #[serde(flatten)]
    pub track: Track,
}

/// Metadata of the loaded track as pushed in `Meta`: the catalog record plus
/// decoder details the server adds when it loads the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMeta {
    #[serde(
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub bitrate: Option<u32>,
    /// Seconds per position unit; converts `Offset`/`Size` to wall time.
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub sec_per_sample: Option<f64>,
    #[serde(flatten)]
    pub track: Track,
}
