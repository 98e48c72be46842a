use serenity::model::id::{ChannelId, UserId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::{
    classifier::RequestClassifier,
    coordinator::{PlaybackCoordinator, PlaybackSettings, PlaybackState},
    request::AudioRequest,
    store::QueueStore,
    transport::{Notifier, VoiceTransport},
    votes::{SkipVoteCoordinator, VoteOutcome},
};
use crate::error::AudioError;

/// What a `/skip` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The requester or a privileged member stopped the request outright.
    Forced { title: String },
    Voted { title: String, outcome: VoteOutcome },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub current: Option<AudioRequest>,
    pub pending: Vec<AudioRequest>,
}

/// Entry point for the command layer: submission, skipping and queue
/// inspection over one guild's queue.
pub struct Jukebox<T: VoiceTransport> {
    classifier: RequestClassifier,
    store: Arc<QueueStore>,
    playback: Arc<PlaybackCoordinator<T>>,
    votes: SkipVoteCoordinator<T>,
}

impl<T: VoiceTransport> Jukebox<T> {
    pub fn new(
        classifier: RequestClassifier,
        store: Arc<QueueStore>,
        transport: T,
        notifier: Arc<dyn Notifier>,
        settings: PlaybackSettings,
    ) -> Arc<Self> {
        let playback = Arc::new(PlaybackCoordinator::new(
            store.clone(),
            transport,
            notifier,
            settings,
        ));
        let votes = SkipVoteCoordinator::new(store.clone(), playback.clone());

        Arc::new(Self {
            classifier,
            store,
            playback,
            votes,
        })
    }

    /// Classifies and enqueues one URL, then makes sure the queue is being
    /// drained. Nothing is enqueued when classification fails.
    pub async fn submit_request(
        &self,
        requester_id: UserId,
        url: &str,
        channel_id: ChannelId,
        duration_cap_secs: Option<u64>,
    ) -> Result<AudioRequest, AudioError> {
        let request = self
            .classifier
            .classify(url, duration_cap_secs)
            .await?
            .into_request(requester_id, channel_id);

        self.store.enqueue(request.clone()).await?;
        self.playback.ensure_draining();
        Ok(request)
    }

    /// Expands a playlist and enqueues its members in playlist order.
    /// Returns how many were enqueued.
    pub async fn expand_collection(
        &self,
        requester_id: UserId,
        url: &str,
        channel_id: ChannelId,
    ) -> Result<usize, AudioError> {
        let sources = self.classifier.classify_collection(url).await?;

        let mut enqueued = 0;
        let mut failure = None;
        for source in sources {
            if let Err(e) = self
                .store
                .enqueue(source.into_request(requester_id, channel_id))
                .await
            {
                failure = Some(e);
                break;
            }
            enqueued += 1;
        }

        info!("📋 {} elementos de playlist agregados", enqueued);
        // Members that made it into the queue play even if a later one failed.
        if enqueued > 0 {
            self.playback.ensure_draining();
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(enqueued),
        }
    }

    /// Runs [`Self::expand_collection`] in the background.
    pub fn submit_collection(
        self: &Arc<Self>,
        requester_id: UserId,
        url: String,
        channel_id: ChannelId,
    ) {
        let jukebox = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = jukebox
                .expand_collection(requester_id, &url, channel_id)
                .await
            {
                error!("❌ Error expandiendo playlist {}: {}", url, e);
            }
        });
    }

    pub async fn cast_skip_vote(&self, user_id: UserId) -> Result<VoteOutcome, AudioError> {
        self.votes.cast(user_id).await
    }

    /// Skips the current request. The requester and privileged members skip
    /// immediately; everyone else casts a vote.
    pub async fn request_skip(
        &self,
        user_id: UserId,
        privileged: bool,
    ) -> Result<SkipOutcome, AudioError> {
        let current = self
            .store
            .current_request()
            .await
            .ok_or(AudioError::NothingPlaying)?;

        if privileged || current.requester_id == user_id {
            if !self.playback.force_stop() {
                return Err(AudioError::NothingPlaying);
            }
            return Ok(SkipOutcome::Forced {
                title: current.title,
            });
        }

        let outcome = self.votes.cast(user_id).await?;
        Ok(SkipOutcome::Voted {
            title: current.title,
            outcome,
        })
    }

    pub fn force_skip(&self) -> bool {
        self.playback.force_stop()
    }

    /// Drops every pending request and stops the current one.
    pub async fn clear_queue(&self) -> Result<usize, AudioError> {
        let cleared = self.store.clear().await?;
        if !self.force_skip() {
            warn!("🗑️ Cola limpiada sin reproducción activa");
        }
        Ok(cleared)
    }

    pub async fn inspect_queue(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.store.current_request().await,
            pending: self.store.queue_snapshot().await,
        }
    }

    pub async fn skip_quorum(&self) -> Option<u32> {
        self.store.skip_quorum().await
    }

    /// Picks up a queue restored from disk. The drain starts even with
    /// nothing pending: its first promotion drops a current request left
    /// behind by the previous process.
    pub async fn resume(&self) -> bool {
        if self.playback.is_idle() {
            if let Some(stale) = self.store.current_request().await {
                warn!("♻️ Descartando request interrumpida: {}", stale.title);
            }
        }
        info!(
            "▶️ Reanudando cola con {} requests pendientes",
            self.store.len().await
        );
        self.playback.ensure_draining()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.playback.subscribe()
    }

    pub fn is_idle(&self) -> bool {
        self.playback.is_idle()
    }
}
