use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::request::AudioRequest;
use crate::{error::AudioError, storage::StateBackend};

/// Handle to the "now playing" message posted for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// The persisted queue document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueState {
    pub queue: VecDeque<AudioRequest>,
    pub current: Option<AudioRequest>,
    pub current_status_ref: Option<StatusRef>,
    pub skip_votes_needed: Option<u32>,
}

/// Vote count and quorum observed inside a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub accepted: bool,
    pub votes: usize,
    pub needed: Option<u32>,
}

impl VoteTally {
    pub fn quorum_reached(&self) -> bool {
        self.needed.is_some_and(|needed| self.votes >= needed as usize)
    }
}

/// Durable FIFO queue plus the current-request slot.
///
/// Every mutation runs as one transaction: the document is copied, mutated,
/// persisted, and only then published. A failed save leaves the published
/// state untouched, so callers never need their own locking.
pub struct QueueStore {
    backend: Arc<dyn StateBackend>,
    state: Mutex<QueueState>,
}

impl QueueStore {
    pub async fn open(backend: Arc<dyn StateBackend>) -> Result<Self, AudioError> {
        let state = backend.load().await?;
        Ok(Self {
            backend,
            state: Mutex::new(state),
        })
    }

    async fn transact<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, AudioError> {
        let mut published = self.state.lock().await;
        let mut draft = published.clone();
        let out = f(&mut draft);
        self.backend.save(&draft).await?;
        *published = draft;
        Ok(out)
    }

    async fn read<R>(&self, f: impl FnOnce(&QueueState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Appends a request to the tail of the queue.
    pub async fn enqueue(&self, request: AudioRequest) -> Result<usize, AudioError> {
        let title = request.title.clone();
        let position = self
            .transact(move |state| {
                state.queue.push_back(request);
                state.queue.len()
            })
            .await?;
        info!("➕ Agregado a la cola (#{}): {}", position, title);
        Ok(position)
    }

    /// Moves the queue head into the current slot.
    ///
    /// The previous current request, its status message and its quorum are
    /// dropped in the same transaction, so no reader ever sees a stale
    /// "now playing" next to a fresh one.
    pub async fn promote_next(&self) -> Result<Option<AudioRequest>, AudioError> {
        let promoted = self
            .transact(|state| {
                state.current = None;
                state.current_status_ref = None;
                state.skip_votes_needed = None;
                let next = state.queue.pop_front();
                state.current = next.clone();
                next
            })
            .await?;

        match &promoted {
            Some(request) => info!("➡️ Siguiente en cola (FIFO): {}", request.title),
            None => debug!("📭 Cola vacía, no hay siguiente request"),
        }
        Ok(promoted)
    }

    /// Clears the current slot once playback of it is over.
    pub async fn finish_current(&self) -> Result<Option<AudioRequest>, AudioError> {
        self.transact(|state| {
            state.current_status_ref = None;
            state.skip_votes_needed = None;
            state.current.take()
        })
        .await
    }

    pub async fn current_request(&self) -> Option<AudioRequest> {
        self.read(|state| state.current.clone()).await
    }

    pub async fn queue_snapshot(&self) -> Vec<AudioRequest> {
        self.read(|state| state.queue.iter().cloned().collect()).await
    }

    pub async fn len(&self) -> usize {
        self.read(|state| state.queue.len()).await
    }

    /// Adds `user_id` to the current request's voters.
    ///
    /// A user already present is rejected (`accepted == false`) and the set is
    /// left as it was.
    pub async fn record_skip_vote(&self, user_id: UserId) -> Result<VoteTally, AudioError> {
        let tally = self
            .transact(|state| {
                let needed = state.skip_votes_needed;
                state.current.as_mut().map(|current| {
                    let accepted = current.skip_voters.insert(user_id);
                    VoteTally {
                        accepted,
                        votes: current.skip_voters.len(),
                        needed,
                    }
                })
            })
            .await?;

        tally.ok_or(AudioError::NothingPlaying)
    }

    /// Current votes against the current quorum, without voting.
    pub async fn vote_tally(&self) -> Option<VoteTally> {
        self.read(|state| {
            state.current.as_ref().map(|current| VoteTally {
                accepted: false,
                votes: current.skip_voters.len(),
                needed: state.skip_votes_needed,
            })
        })
        .await
    }

    pub async fn set_skip_quorum(&self, needed: u32) -> Result<(), AudioError> {
        self.transact(|state| state.skip_votes_needed = Some(needed))
            .await
    }

    pub async fn skip_quorum(&self) -> Option<u32> {
        self.read(|state| state.skip_votes_needed).await
    }

    pub async fn set_status_ref(&self, status: StatusRef) -> Result<(), AudioError> {
        self.transact(|state| state.current_status_ref = Some(status))
            .await
    }

    pub async fn status_ref(&self) -> Option<StatusRef> {
        self.read(|state| state.current_status_ref).await
    }

    /// Drops every pending request. The current request is left alone.
    pub async fn clear(&self) -> Result<usize, AudioError> {
        let cleared = self
            .transact(|state| {
                let cleared = state.queue.len();
                state.queue.clear();
                cleared
            })
            .await?;
        info!("🗑️ Cola limpiada: {} requests removidos", cleared);
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::request;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    async fn store() -> (Arc<MemoryStorage>, QueueStore) {
        let backend = Arc::new(MemoryStorage::default());
        let store = QueueStore::open(backend.clone()).await.unwrap();
        (backend, store)
    }

    #[tokio::test]
    async fn playback_order_matches_enqueue_order() {
        let (_, store) = store().await;
        let titles: Vec<String> = (0..12).map(|i| format!("track-{i}")).collect();
        for title in &titles {
            store.enqueue(request(title, 1)).await.unwrap();
        }

        let mut played = Vec::new();
        while let Some(next) = store.promote_next().await.unwrap() {
            played.push(next.title);
        }

        assert_eq!(played, titles);
        assert!(store.current_request().await.is_none());
    }

    #[tokio::test]
    async fn promotion_replaces_current_and_resets_vote_state() {
        let (_, store) = store().await;
        store.enqueue(request("a", 1)).await.unwrap();
        store.enqueue(request("b", 1)).await.unwrap();

        store.promote_next().await.unwrap();
        store.set_skip_quorum(2).await.unwrap();
        store.record_skip_vote(UserId::new(7)).await.unwrap();

        let b = store.promote_next().await.unwrap().unwrap();
        assert_eq!(b.title, "b");
        assert!(b.skip_voters.is_empty());
        assert_eq!(store.skip_quorum().await, None);
        assert_eq!(store.queue_snapshot().await, Vec::new());
    }

    #[tokio::test]
    async fn voting_twice_never_grows_the_voter_set() {
        let (_, store) = store().await;
        store.enqueue(request("a", 1)).await.unwrap();
        store.promote_next().await.unwrap();
        store.set_skip_quorum(3).await.unwrap();

        let first = store.record_skip_vote(UserId::new(5)).await.unwrap();
        let second = store.record_skip_vote(UserId::new(5)).await.unwrap();

        assert!(first.accepted);
        assert!(!second.accepted);
        assert_eq!(second.votes, 1);
        assert_eq!(store.current_request().await.unwrap().skip_voters.len(), 1);
    }

    #[tokio::test]
    async fn vote_without_current_request_fails() {
        let (_, store) = store().await;
        let err = store.record_skip_vote(UserId::new(5)).await.unwrap_err();
        assert!(matches!(err, AudioError::NothingPlaying));
    }

    #[tokio::test]
    async fn quorum_is_reached_at_the_needed_count() {
        let (_, store) = store().await;
        store.enqueue(request("a", 1)).await.unwrap();
        store.promote_next().await.unwrap();
        store.set_skip_quorum(2).await.unwrap();

        assert!(!store.record_skip_vote(UserId::new(2)).await.unwrap().quorum_reached());
        assert!(store.record_skip_vote(UserId::new(3)).await.unwrap().quorum_reached());
    }

    #[tokio::test]
    async fn clear_keeps_the_current_request() {
        let (_, store) = store().await;
        for title in ["a", "b", "c"] {
            store.enqueue(request(title, 1)).await.unwrap();
        }
        store.promote_next().await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.len().await, 0);
        assert_eq!(store.current_request().await.unwrap().title, "a");
    }

    #[tokio::test]
    async fn failed_save_leaves_state_unchanged() {
        let (backend, store) = store().await;
        store.enqueue(request("a", 1)).await.unwrap();

        backend.set_failing(true);
        let err = store.enqueue(request("b", 1)).await.unwrap_err();
        assert!(matches!(err, AudioError::StoreUnavailable(_)));
        assert!(store.promote_next().await.is_err());

        assert_eq!(store.len().await, 1);
        assert!(store.current_request().await.is_none());
        assert_eq!(backend.saved().queue.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_votes_are_all_recorded_once() {
        let (_, store) = store().await;
        let store = Arc::new(store);
        store.enqueue(request("a", 1)).await.unwrap();
        store.promote_next().await.unwrap();
        store.set_skip_quorum(50).await.unwrap();

        let votes = (0..20u64).flat_map(|user| {
            let first = store.clone();
            let second = store.clone();
            [
                tokio::spawn(async move { first.record_skip_vote(UserId::new(user + 1)).await }),
                tokio::spawn(async move { second.record_skip_vote(UserId::new(user + 1)).await }),
            ]
        });
        let results = futures::future::join_all(votes).await;

        let accepted = results
            .into_iter()
            .filter(|r| r.as_ref().unwrap().as_ref().unwrap().accepted)
            .count();
        assert_eq!(accepted, 20);
        assert_eq!(store.current_request().await.unwrap().skip_votes(), 20);
    }
}
