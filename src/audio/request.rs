use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, UserId};
use std::collections::BTreeSet;
use std::time::Duration;

/// How the audio behind a URL is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Platform-hosted link that has to be extracted (yt-dlp).
    Streamed,
    /// Direct link to a media file.
    Direct,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Streamed => "streamed",
            SourceKind::Direct => "direct",
        }
    }
}

/// Result of classifying a URL, before it is bound to a requester and a
/// voice channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSource {
    pub url: String,
    pub kind: SourceKind,
    pub title: String,
    pub start_offset_secs: u64,
    pub duration_cap_secs: Option<u64>,
}

impl ClassifiedSource {
    pub fn into_request(self, requester_id: UserId, channel_id: ChannelId) -> AudioRequest {
        AudioRequest {
            requester_id,
            url: self.url,
            kind: self.kind,
            title: self.title,
            start_offset_secs: self.start_offset_secs,
            duration_cap_secs: self.duration_cap_secs,
            channel_id,
            skip_voters: BTreeSet::new(),
            requested_at: Utc::now(),
        }
    }
}

/// A queued or playing audio request.
///
/// `skip_voters` only ever grows for a given request; a fresh request starts
/// with an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRequest {
    pub requester_id: UserId,
    pub url: String,
    pub kind: SourceKind,
    pub title: String,
    #[serde(default)]
    pub start_offset_secs: u64,
    #[serde(default)]
    pub duration_cap_secs: Option<u64>,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub skip_voters: BTreeSet<UserId>,
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
}

impl AudioRequest {
    pub fn start_offset(&self) -> Duration {
        Duration::from_secs(self.start_offset_secs)
    }

    pub fn duration_cap(&self) -> Option<Duration> {
        self.duration_cap_secs.map(Duration::from_secs)
    }

    pub fn skip_votes(&self) -> usize {
        self.skip_voters.len()
    }
}
