//! Seams between the playback loop and the outside world: the voice
//! transport that turns requests into sound, and the channel the status
//! line is posted to.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::{request::AudioRequest, store::StatusRef};
use crate::error::AudioError;

/// How an attached resource stopped on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Finished,
    Failed(String),
}

/// Stop control over a playing resource. Stopping twice is a no-op.
pub trait PlaybackControl: Send + Sync {
    fn stop(&self);
}

/// Resolves the terminal event of one playback. The first event wins; later
/// ones are dropped.
#[derive(Clone)]
pub struct TerminalSender(Arc<Mutex<Option<oneshot::Sender<TerminalEvent>>>>);

impl TerminalSender {
    pub fn resolve(&self, event: TerminalEvent) -> bool {
        match self.0.lock().take() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

/// A resource attached to the player, awaited by the coordinator.
pub struct PlaybackHandle {
    ended: oneshot::Receiver<TerminalEvent>,
    control: Box<dyn PlaybackControl>,
}

impl PlaybackHandle {
    pub fn new(control: impl PlaybackControl + 'static) -> (Self, TerminalSender) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            ended: rx,
            control: Box::new(control),
        };
        (handle, TerminalSender(Arc::new(Mutex::new(Some(tx)))))
    }

    /// Waits until the resource ends or errors.
    pub async fn terminal_event(&mut self) -> TerminalEvent {
        match (&mut self.ended).await {
            Ok(event) => event,
            Err(_) => TerminalEvent::Failed("player dropped the track".to_string()),
        }
    }

    pub fn stop(&self) {
        self.control.stop();
    }
}

/// Voice connection and transcoding pipeline.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;
    type Source: Send + 'static;

    /// Opens the byte stream for a request, starting at its offset.
    async fn open_source(&self, request: &AudioRequest) -> Result<Self::Source, AudioError>;

    async fn join_channel(&self, channel_id: ChannelId) -> Result<Self::Connection, AudioError>;

    async fn attach_and_play(
        &self,
        connection: &Self::Connection,
        source: Self::Source,
    ) -> Result<PlaybackHandle, AudioError>;

    async fn disconnect(&self, connection: Self::Connection);

    /// Members currently in the channel, the bot excluded.
    async fn channel_occupancy(&self, channel_id: ChannelId) -> usize;
}

/// Where the "now playing" status line and notices go.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_status(&self, content: &str) -> anyhow::Result<StatusRef>;
    async fn edit_status(&self, status: StatusRef, content: &str) -> anyhow::Result<()>;
    async fn post_notice(&self, content: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl PlaybackControl for Noop {
        fn stop(&self) {}
    }

    #[tokio::test]
    async fn first_terminal_event_wins() {
        let (mut handle, sender) = PlaybackHandle::new(Noop);
        let errors = sender.clone();

        assert!(errors.resolve(TerminalEvent::Failed("decoder".into())));
        assert!(!sender.resolve(TerminalEvent::Finished));
        assert_eq!(
            handle.terminal_event().await,
            TerminalEvent::Failed("decoder".into())
        );
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_failure() {
        let (mut handle, sender) = PlaybackHandle::new(Noop);
        drop(sender);
        assert!(matches!(handle.terminal_event().await, TerminalEvent::Failed(_)));
    }
}
