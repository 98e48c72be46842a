//! In-memory stand-ins for the voice transport, the status channel and the
//! metadata resolver.

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{
    classifier::MetadataResolver,
    request::{AudioRequest, SourceKind},
    store::StatusRef,
    transport::{Notifier, PlaybackControl, PlaybackHandle, TerminalEvent, TerminalSender, VoiceTransport},
};
use crate::error::AudioError;

/// Direct-file request in channel 10 with a 30 second cap.
pub fn request(title: &str, requester: u64) -> AudioRequest {
    AudioRequest {
        requester_id: UserId::new(requester),
        url: format!("https://cdn.example.com/{title}.mp3"),
        kind: SourceKind::Direct,
        title: title.to_string(),
        start_offset_secs: 0,
        duration_cap_secs: Some(30),
        channel_id: ChannelId::new(10),
        skip_voters: Default::default(),
        requested_at: chrono::Utc::now(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Join(u64),
    Open(String),
    Play(String),
    Stop(String),
    Leave(u64),
}

#[derive(Default)]
struct TransportLog {
    events: Mutex<Vec<TransportEvent>>,
    playing: Mutex<HashMap<String, TerminalSender>>,
    failing: Mutex<HashSet<String>>,
    occupancy: Mutex<usize>,
}

impl TransportLog {
    fn push(&self, event: TransportEvent) {
        self.events.lock().push(event);
    }
}

/// Records every transport call. Resources never end on their own; tests
/// call [`FakeTransport::finish`] or let a skip or cap stop them.
#[derive(Clone)]
pub struct FakeTransport {
    log: Arc<TransportLog>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        let log = TransportLog::default();
        *log.occupancy.lock() = 1;
        Self { log: Arc::new(log) }
    }
}

impl FakeTransport {
    pub fn events(&self) -> Vec<TransportEvent> {
        self.log.events.lock().clone()
    }

    pub fn set_occupancy(&self, members: usize) {
        *self.log.occupancy.lock() = members;
    }

    /// Makes `open_source` fail for the given title.
    pub fn fail_source(&self, title: &str) {
        self.log.failing.lock().insert(title.to_string());
    }

    /// Ends the resource playing `title` as if it ran out.
    pub fn finish(&self, title: &str) -> bool {
        match self.log.playing.lock().remove(title) {
            Some(sender) => sender.resolve(TerminalEvent::Finished),
            None => false,
        }
    }

    /// Reports a player error on the resource playing `title`.
    pub fn break_playback(&self, title: &str) -> bool {
        match self.log.playing.lock().remove(title) {
            Some(sender) => sender.resolve(TerminalEvent::Failed("decoder error".into())),
            None => false,
        }
    }
}

struct FakeControl {
    title: String,
    log: Arc<TransportLog>,
}

impl PlaybackControl for FakeControl {
    fn stop(&self) {
        self.log.push(TransportEvent::Stop(self.title.clone()));
        if let Some(sender) = self.log.playing.lock().remove(&self.title) {
            sender.resolve(TerminalEvent::Finished);
        }
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    type Connection = ChannelId;
    type Source = String;

    async fn open_source(&self, request: &AudioRequest) -> Result<String, AudioError> {
        if self.log.failing.lock().contains(&request.title) {
            return Err(AudioError::resource(&request.url, "connection refused"));
        }
        self.log.push(TransportEvent::Open(request.title.clone()));
        Ok(request.title.clone())
    }

    async fn join_channel(&self, channel_id: ChannelId) -> Result<ChannelId, AudioError> {
        self.log.push(TransportEvent::Join(channel_id.get()));
        Ok(channel_id)
    }

    async fn attach_and_play(
        &self,
        _connection: &ChannelId,
        title: String,
    ) -> Result<PlaybackHandle, AudioError> {
        let (handle, sender) = PlaybackHandle::new(FakeControl {
            title: title.clone(),
            log: self.log.clone(),
        });
        self.log.playing.lock().insert(title.clone(), sender);
        self.log.push(TransportEvent::Play(title));
        Ok(handle)
    }

    async fn disconnect(&self, connection: ChannelId) {
        self.log.push(TransportEvent::Leave(connection.get()));
    }

    async fn channel_occupancy(&self, _channel_id: ChannelId) -> usize {
        *self.log.occupancy.lock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    Status(String),
    Edit(u64, String),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Posted>>,
}

impl RecordingNotifier {
    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.posted()
            .into_iter()
            .filter_map(|p| match p {
                Posted::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_edit(&self) -> Option<String> {
        self.posted().into_iter().rev().find_map(|p| match p {
            Posted::Edit(_, text) => Some(text),
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_status(&self, content: &str) -> anyhow::Result<StatusRef> {
        let mut posted = self.posted.lock();
        posted.push(Posted::Status(content.to_string()));
        Ok(StatusRef {
            channel_id: ChannelId::new(99),
            message_id: MessageId::new(posted.len() as u64),
        })
    }

    async fn edit_status(&self, status: StatusRef, content: &str) -> anyhow::Result<()> {
        self.posted
            .lock()
            .push(Posted::Edit(status.message_id.get(), content.to_string()));
        Ok(())
    }

    async fn post_notice(&self, content: &str) -> anyhow::Result<()> {
        self.posted.lock().push(Posted::Notice(content.to_string()));
        Ok(())
    }
}

/// Resolver answering from fixed tables.
#[derive(Default)]
pub struct StaticResolver {
    pub titles: HashMap<String, String>,
    pub collections: HashMap<String, Vec<String>>,
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve_title(&self, url: &str) -> anyhow::Result<String> {
        self.titles
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("video unavailable"))
    }

    async fn list_collection(&self, url: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        let members = self
            .collections
            .get(url)
            .ok_or_else(|| anyhow!("playlist not found"))?;
        Ok(members.iter().take(limit).cloned().collect())
    }
}
