//! The push-channel message.
//!
//! Every frame the server writes to the event websocket is a JSON object that
//! carries *any subset* of the keys below. A full status (sent on connect and
//! whenever a new track is loaded) carries most of them; a volume change
//! carries only `Volume`. Absent keys mean "unchanged", never "reset".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::lenient;
use crate::track::{QueueEntry, Track, TrackMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "Volume", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    /// Length of the loaded track in position units.
    #[serde(rename = "Size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Current position in position units.
    #[serde(rename = "Offset", default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// `Some(None)` when the server explicitly reports no loaded track.
    #[serde(
        rename = "Meta",
        default,
        deserialize_with = "lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta: Option<Option<TrackMeta>>,
    /// `Some(None)` marks the end of a library scan.
    #[serde(
        rename = "Scan",
        default,
        deserialize_with = "lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub scan: Option<Option<ScanProgress>>,
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TransportState>,
    #[serde(rename = "Queue", default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<Vec<QueueEntry>>,
    #[serde(rename = "Recent", default, skip_serializing_if = "Option::is_none")]
    pub recent: Option<Vec<Track>>,
    #[serde(rename = "RepeatMode", default, skip_serializing_if = "Option::is_none")]
    pub repeat_mode: Option<RepeatMode>,
    /// Player-side error text. Informational only.
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PushMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the fields present in this message, in dispatch order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.volume.is_some() {
            names.push("Volume");
        }
        if self.size.is_some() {
            names.push("Size");
        }
        if self.offset.is_some() {
            names.push("Offset");
        }
        if self.meta.is_some() {
            names.push("Meta");
        }
        if self.scan.is_some() {
            names.push("Scan");
        }
        if self.state.is_some() {
            names.push("State");
        }
        if self.queue.is_some() {
            names.push("Queue");
        }
        if self.recent.is_some() {
            names.push("Recent");
        }
        if self.repeat_mode.is_some() {
            names.push("RepeatMode");
        }
        names
    }
}

/// Player transport state, sent on the wire as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransportState {
    /// Nothing loaded.
    #[default]
    Empty,
    Playing,
    Paused,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid transport state {0}")]
pub struct InvalidTransportState(pub u8);

impl TryFrom<u8> for TransportState {
    type Error = InvalidTransportState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Playing),
            2 => Ok(Self::Paused),
            other => Err(InvalidTransportState(other)),
        }
    }
}

impl From<TransportState> for u8 {
    fn from(state: TransportState) -> Self {
        match state {
            TransportState::Empty => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Playing => "playing",
            Self::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    DontRepeat,
    RepeatOne,
    RepeatAll,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid repeat mode {0:?}")]
pub struct InvalidRepeatMode(pub String);

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DontRepeat => "DontRepeat",
            Self::RepeatOne => "RepeatOne",
            Self::RepeatAll => "RepeatAll",
        }
    }

    /// Next mode in the toggle order used by the repeat button.
    pub fn cycle(self) -> Self {
        match self {
            Self::DontRepeat => Self::RepeatOne,
            Self::RepeatOne => Self::RepeatAll,
            Self::RepeatAll => Self::DontRepeat,
        }
    }
}

impl FromStr for RepeatMode {
    type Err = InvalidRepeatMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DontRepeat" => Ok(Self::DontRepeat),
            "RepeatOne" => Ok(Self::RepeatOne),
            "RepeatAll" => Ok(Self::RepeatAll),
            other => Err(InvalidRepeatMode(other.to_string())),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file the library scanner just indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanProgress {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_message_leaves_other_fields_absent() {
        let msg = PushMessage::decode(r#"{"Volume": 42}"#).unwrap();
        assert_eq!(msg.volume, Some(42));
        assert_eq!(msg.offset, None);
        assert_eq!(msg.meta, None);
        assert_eq!(msg.field_names(), vec!["Volume"]);
    }

    #[test]
    fn test_full_status_message() {
        let msg = PushMessage::decode(
            r#"{"Offset":1200,"Size":96000,"State":2,"Volume":80,
                "Meta":{"artist":"Low","title":"Sunflower","path":"low/01.mp3","rate":"44100"},
                "Queue":[{"path":"a.mp3","queueId":"0"},{"path":"a.mp3","queueId":"1"}],
                "Recent":[{"path":"b.mp3"}],
                "RepeatMode":"RepeatAll"}"#,
        )
        .unwrap();
        assert_eq!(msg.state, Some(TransportState::Paused));
        assert_eq!(msg.repeat_mode, Some(RepeatMode::RepeatAll));
        let meta = msg.meta.clone().flatten().unwrap();
        assert_eq!(meta.track.rate, Some(44100));
        assert_eq!(msg.queue.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            msg.field_names(),
            vec!["Volume", "Size", "Offset", "Meta", "State", "Queue", "Recent", "RepeatMode"]
        );
    }

    #[test]
    fn test_null_meta_and_scan_are_present() {
        let msg = PushMessage::decode(r#"{"Meta": null, "Scan": null, "State": 0}"#).unwrap();
        assert_eq!(msg.meta, Some(None));
        assert_eq!(msg.scan, Some(None));
        assert_eq!(msg.state, Some(TransportState::Empty));
    }

    #[test]
    fn test_scan_progress_record() {
        let msg = PushMessage::decode(
            r#"{"Scan": {"Artist": "Low", "Album": "Secret Name", "Title": "Weight of Water", "Path": "/m/low/w.mp3"}}"#,
        )
        .unwrap();
        let progress = msg.scan.flatten().unwrap();
        assert_eq!(progress.path, "/m/low/w.mp3");
        assert_eq!(progress.artist, "Low");
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        assert!(PushMessage::decode(r#"{"State": 9}"#).is_err());
        assert_eq!(TransportState::try_from(9), Err(InvalidTransportState(9)));
    }

    #[test]
    fn test_encode_keeps_explicit_null() {
        let msg = PushMessage {
            meta: Some(None),
            offset: Some(5),
            ..PushMessage::default()
        };
        let text = msg.encode().unwrap();
        assert_eq!(PushMessage::decode(&text).unwrap(), msg);
        assert!(text.contains("\"Meta\":null"));
    }

    #[test]
    fn test_repeat_mode_cycle_and_parse() {
        assert_eq!(RepeatMode::DontRepeat.cycle(), RepeatMode::RepeatOne);
        assert_eq!(RepeatMode::RepeatAll.cycle(), RepeatMode::DontRepeat);
        assert_eq!("RepeatOne".parse::<RepeatMode>(), Ok(RepeatMode::RepeatOne));
        assert!("Shuffle".parse::<RepeatMode>().is_err());
    }
}
