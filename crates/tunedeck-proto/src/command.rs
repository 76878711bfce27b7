//! Player command surface: one request per user-visible control.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::push::RepeatMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    GetVolume,
    /// 0–100.
    SetVolume(u8),
    Load { path: String },
    /// Absolute position in position units.
    Seek(i64),
    Enqueue { path: String },
    /// Shift queue entries by one slot; `delta` is clamped to ±1 server-side.
    Move { indexes: Vec<usize>, delta: i32 },
    MoveToTop { indexes: Vec<usize> },
    Remove { indexes: Vec<usize> },
    ClearQueue,
    SetRepeatMode(RepeatMode),
    StartScan,
}

impl PlayerCommand {
    pub fn method(&self) -> Method {
        match self {
            PlayerCommand::Play
            | PlayerCommand::Pause
            | PlayerCommand::Stop
            | PlayerCommand::GetVolume
            | PlayerCommand::StartScan => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            PlayerCommand::Play => "/player/play",
            PlayerCommand::Pause => "/player/pause",
            PlayerCommand::Stop => "/player/stop",
            PlayerCommand::GetVolume | PlayerCommand::SetVolume(_) => "/player/volume",
            PlayerCommand::Load { .. } => "/player/load",
            PlayerCommand::Seek(_) => "/player/seek",
            PlayerCommand::Enqueue { .. } => "/player/queue.enqueue",
            PlayerCommand::Move { .. } => "/player/queue.move",
            PlayerCommand::MoveToTop { .. } => "/player/queue.move_to_top",
            PlayerCommand::Remove { .. } => "/player/queue.remove",
            PlayerCommand::ClearQueue => "/player/queue.clear",
            PlayerCommand::SetRepeatMode(_) => "/player/repeat_mode",
            PlayerCommand::StartScan => "/scan/all",
        }
    }

    /// JSON body for POST commands.
    pub fn body(&self) -> Option<Value> {
        match self {
            PlayerCommand::SetVolume(volume) => Some(json!({ "Volume": volume })),
            PlayerCommand::Load { path } | PlayerCommand::Enqueue { path } => {
                Some(json!({ "File": path }))
            }
            PlayerCommand::Seek(offset) => Some(json!({ "Seek": offset })),
            PlayerCommand::Move { indexes, delta } => {
                Some(json!({ "Indexes": indexes, "Delta": delta }))
            }
            PlayerCommand::MoveToTop { indexes } | PlayerCommand::Remove { indexes } => {
                Some(json!({ "Indexes": indexes }))
            }
            PlayerCommand::ClearQueue => Some(json!({})),
            PlayerCommand::SetRepeatMode(mode) => Some(json!({ "Mode": mode.as_str() })),
            _ => None,
        }
    }

    /// Decode the response body. Most commands reply with nothing useful.
    pub fn parse_reply(&self, body: &str) -> Result<CommandReply, serde_json::Error> {
        match self {
            PlayerCommand::GetVolume => {
                let reply: VolumeReply = serde_json::from_str(body)?;
                Ok(CommandReply::Volume(reply.volume))
            }
            PlayerCommand::Load { .. } => {
                let reply: LoadReply = serde_json::from_str(body)?;
                Ok(CommandReply::Loaded { size: reply.size })
            }
            _ => Ok(CommandReply::Done),
        }
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::SetVolume(v) => write!(f, "set volume {}", v),
            PlayerCommand::Seek(offset) => write!(f, "seek {}", offset),
            PlayerCommand::Load { path } => write!(f, "load {}", path),
            PlayerCommand::Enqueue { path } => write!(f, "enqueue {}", path),
            PlayerCommand::SetRepeatMode(mode) => write!(f, "repeat mode {}", mode),
            other => f.write_str(other.route()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Done,
    Volume(u8),
    Loaded { size: i64 },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeReply {
    pub volume: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadReply {
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_commands_have_no_body() {
        for cmd in [
            PlayerCommand::Play,
            PlayerCommand::Pause,
            PlayerCommand::Stop,
            PlayerCommand::StartScan,
        ] {
            assert_eq!(cmd.method(), Method::Get);
            assert!(cmd.body().is_none());
        }
    }

    #[test]
    fn test_post_bodies_use_server_field_names() {
        assert_eq!(
            PlayerCommand::SetVolume(55).body(),
            Some(json!({ "Volume": 55 }))
        );
        assert_eq!(
            PlayerCommand::Move {
                indexes: vec![2, 3],
                delta: -1
            }
            .body(),
            Some(json!({ "Indexes": [2, 3], "Delta": -1 }))
        );
        assert_eq!(
            PlayerCommand::SetRepeatMode(RepeatMode::RepeatAll).body(),
            Some(json!({ "Mode": "RepeatAll" }))
        );
        assert_eq!(PlayerCommand::Seek(4410).route(), "/player/seek");
    }

    #[test]
    fn test_reply_parsing() {
        assert_eq!(
            PlayerCommand::GetVolume.parse_reply(r#"{"volume": 37}"#).unwrap(),
            CommandReply::Volume(37)
        );
        let load = PlayerCommand::Load {
            path: "a.mp3".to_string(),
        };
        assert_eq!(
            load.parse_reply(r#"{"size": 882000}"#).unwrap(),
            CommandReply::Loaded { size: 882000 }
        );
        assert_eq!(PlayerCommand::Stop.parse_reply("").unwrap(), CommandReply::Done);
    }
}
