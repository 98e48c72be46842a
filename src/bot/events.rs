use serenity::async_trait;
use songbird::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler};
use tracing::{debug, error};

use crate::audio::transport::{TerminalEvent, TerminalSender};

/// Handler para cuando termina un track
pub struct TrackEndHandler {
    pub title: String,
    pub ended: TerminalSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if self.ended.resolve(TerminalEvent::Finished) {
            debug!("🎵 Track terminó: {}", self.title);
        }
        None
    }
}

/// Handler para errores de tracks
pub struct TrackErrorHandler {
    pub title: String,
    pub ended: TerminalSender,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let mut reason = String::from("track error");
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                error!("❌ Error en track {}: {:?}", self.title, state.playing);
                reason = format!("{:?}", state.playing);
            }
        }

        self.ended.resolve(TerminalEvent::Failed(reason));
        None
    }
}
