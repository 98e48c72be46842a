use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::info;

use super::{coordinator::PlaybackCoordinator, store::QueueStore, transport::VoiceTransport};
use crate::error::AudioError;

/// Votes needed to skip with `occupancy` members in the channel: a share of
/// everyone except the first listener, and never less than one.
pub fn skip_quorum(occupancy: usize, fraction: f64) -> u32 {
    let others = occupancy.saturating_sub(1) as f64;
    ((others * fraction).floor() as u32).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    AlreadyVoted,
    Counted { votes: usize, needed: Option<u32> },
    QuorumReached { votes: usize, needed: u32 },
}

/// Records skip votes on the current request and stops it once enough
/// listeners agree.
pub struct SkipVoteCoordinator<T: VoiceTransport> {
    store: Arc<QueueStore>,
    playback: Arc<PlaybackCoordinator<T>>,
}

impl<T: VoiceTransport> SkipVoteCoordinator<T> {
    pub fn new(store: Arc<QueueStore>, playback: Arc<PlaybackCoordinator<T>>) -> Self {
        Self { store, playback }
    }

    pub async fn cast(&self, user_id: UserId) -> Result<VoteOutcome, AudioError> {
        let tally = self.store.record_skip_vote(user_id).await?;
        if !tally.accepted {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        self.playback.refresh_status(false).await;

        match tally.needed {
            Some(needed) if tally.quorum_reached() => {
                info!("⏭️ Votación de skip alcanzada ({}/{})", tally.votes, needed);
                self.playback.force_stop();
                Ok(VoteOutcome::QuorumReached {
                    votes: tally.votes,
                    needed,
                })
            }
            needed => Ok(VoteOutcome::Counted {
                votes: tally.votes,
                needed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_is_half_of_the_other_listeners() {
        assert_eq!(skip_quorum(1, 0.5), 1);
        assert_eq!(skip_quorum(2, 0.5), 1);
        assert_eq!(skip_quorum(5, 0.5), 2);
        assert_eq!(skip_quorum(7, 0.5), 3);
        assert_eq!(skip_quorum(8, 0.5), 3);
    }

    #[test]
    fn empty_channel_still_needs_one_vote() {
        assert_eq!(skip_quorum(0, 0.5), 1);
        assert_eq!(skip_quorum(3, 0.1), 1);
    }

    #[test]
    fn fraction_scales_the_quorum() {
        assert_eq!(skip_quorum(11, 1.0), 10);
        assert_eq!(skip_quorum(11, 0.25), 2);
    }
}
