use parking_lot::Mutex;
use serenity::model::id::ChannelId;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    request::AudioRequest,
    store::QueueStore,
    transport::{Notifier, TerminalEvent, VoiceTransport},
    votes::skip_quorum,
};
use crate::{error::AudioError, ui::messages::now_playing};

/// Externally visible phase of the playback loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Connecting { title: String },
    Playing { title: String },
    Completing { title: String },
}

/// Why a request stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    Finished,
    Skipped,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// Upper bound for requests without their own cap.
    pub max_duration: Duration,
    /// Share of the other listeners needed to skip.
    pub vote_fraction: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(24 * 60 * 60),
            vote_fraction: 0.5,
        }
    }
}

struct ActiveConnection<C> {
    channel_id: ChannelId,
    handle: C,
}

enum DrainExit {
    Empty,
    StoreFailed,
}

/// Drains the queue one request at a time.
///
/// At most one drain task exists. It owns the voice connection for as long
/// as it runs, reusing it while consecutive requests target the same channel,
/// and tears it down when the queue runs dry.
pub struct PlaybackCoordinator<T: VoiceTransport> {
    store: Arc<QueueStore>,
    transport: T,
    notifier: Arc<dyn Notifier>,
    settings: PlaybackSettings,
    draining: AtomicBool,
    stop_current: Mutex<Option<CancellationToken>>,
    state: watch::Sender<PlaybackState>,
}

impl<T: VoiceTransport> PlaybackCoordinator<T> {
    pub fn new(
        store: Arc<QueueStore>,
        transport: T,
        notifier: Arc<dyn Notifier>,
        settings: PlaybackSettings,
    ) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            store,
            transport,
            notifier,
            settings,
            draining: AtomicBool::new(false),
            stop_current: Mutex::new(None),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn is_idle(&self) -> bool {
        !self.draining.load(Ordering::SeqCst)
    }

    /// Starts the drain task unless one is already running. Returns whether
    /// this call started it.
    pub fn ensure_draining(self: &Arc<Self>) -> bool {
        if !self.claim() {
            return false;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run().await;
        });
        true
    }

    fn claim(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn run(&self) {
        loop {
            let exit = self.drain().await;
            self.draining.store(false, Ordering::SeqCst);

            // A request enqueued after the last empty promotion found the
            // flag still set and did not start a task of its own.
            if matches!(exit, DrainExit::StoreFailed)
                || self.store.len().await == 0
                || !self.claim()
            {
                break;
            }
        }
    }

    async fn drain(&self) -> DrainExit {
        let mut connection: Option<ActiveConnection<T::Connection>> = None;

        let exit = loop {
            // The token must exist before the promotion is visible, or a skip
            // landing in between finds nothing to cancel.
            let stop = CancellationToken::new();
            *self.stop_current.lock() = Some(stop.clone());

            let request = match self.store.promote_next().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    *self.stop_current.lock() = None;
                    break DrainExit::Empty;
                }
                Err(e) => {
                    *self.stop_current.lock() = None;
                    error!("❌ No se pudo avanzar la cola: {}", e);
                    break DrainExit::StoreFailed;
                }
            };

            let end = self.play(&request, stop, &mut connection).await;
            self.complete(&request, end).await;
        };

        if let Some(active) = connection.take() {
            self.transport.disconnect(active.handle).await;
            info!("🔇 Cola terminada, desconectado de {}", active.channel_id);
        }
        self.state.send_replace(PlaybackState::Idle);
        exit
    }

    async fn play(
        &self,
        request: &AudioRequest,
        stop: CancellationToken,
        connection: &mut Option<ActiveConnection<T::Connection>>,
    ) -> PlaybackEnd {
        self.state.send_replace(PlaybackState::Connecting {
            title: request.title.clone(),
        });

        self.announce(request).await;

        let handle = match self.connect(request.channel_id, connection).await {
            Ok(handle) => handle,
            Err(e) => return self.abandon(request, e).await,
        };

        let source = match self.transport.open_source(request).await {
            Ok(source) => source,
            Err(e) => return self.abandon(request, e).await,
        };
        if stop.is_cancelled() {
            return PlaybackEnd::Skipped;
        }

        let mut playback = match self.transport.attach_and_play(handle, source).await {
            Ok(playback) => playback,
            Err(e) => return self.abandon(request, e).await,
        };

        self.state.send_replace(PlaybackState::Playing {
            title: request.title.clone(),
        });
        info!("🎵 Reproduciendo: {}", request.title);

        let limit = request
            .duration_cap()
            .unwrap_or(self.settings.max_duration)
            .min(self.settings.max_duration);

        let end = tokio::select! {
            event = playback.terminal_event() => match event {
                TerminalEvent::Finished => PlaybackEnd::Finished,
                TerminalEvent::Failed(reason) => {
                    warn!("⚠️ Error de reproducción en {}: {}", request.title, reason);
                    PlaybackEnd::Failed
                }
            },
            _ = stop.cancelled() => PlaybackEnd::Skipped,
            _ = tokio::time::sleep(limit) => {
                info!(
                    "⏱️ Deteniendo {} tras alcanzar su duración ({:?})",
                    request.title, limit
                );
                PlaybackEnd::TimedOut
            }
        };

        if matches!(end, PlaybackEnd::Skipped | PlaybackEnd::TimedOut) {
            playback.stop();
        }
        end
    }

    /// Computes the quorum and posts the status line for a freshly promoted
    /// request.
    async fn announce(&self, request: &AudioRequest) {
        let occupancy = self.transport.channel_occupancy(request.channel_id).await;
        let needed = skip_quorum(occupancy, self.settings.vote_fraction);
        if let Err(e) = self.store.set_skip_quorum(needed).await {
            warn!("No se pudo guardar el quórum de {}: {}", request.title, e);
        }
        debug!("🗳️ Quórum para {}: {} ({} oyentes)", request.title, needed, occupancy);

        // Votes may have been cast while the quorum was still unknown.
        let current = self
            .store
            .current_request()
            .await
            .unwrap_or_else(|| request.clone());
        match self
            .notifier
            .post_status(&now_playing(&current, Some(needed), false))
            .await
        {
            Ok(status) => {
                if let Err(e) = self.store.set_status_ref(status).await {
                    warn!("No se pudo guardar el mensaje de estado: {}", e);
                }
            }
            Err(e) => warn!("No se pudo publicar el estado de {}: {}", request.title, e),
        }

        if self
            .store
            .vote_tally()
            .await
            .is_some_and(|tally| tally.quorum_reached())
        {
            self.force_stop();
        }
    }

    async fn connect<'a>(
        &self,
        channel_id: ChannelId,
        slot: &'a mut Option<ActiveConnection<T::Connection>>,
    ) -> Result<&'a T::Connection, AudioError> {
        if slot.as_ref().is_some_and(|active| active.channel_id != channel_id) {
            if let Some(previous) = slot.take() {
                info!("🔀 Cambiando de canal {} a {}", previous.channel_id, channel_id);
                self.transport.disconnect(previous.handle).await;
            }
        }

        if slot.is_none() {
            let handle = self.transport.join_channel(channel_id).await?;
            info!("🔊 Conectado al canal de voz {}", channel_id);
            *slot = Some(ActiveConnection { channel_id, handle });
        }

        slot.as_ref()
            .map(|active| &active.handle)
            .ok_or_else(|| AudioError::VoiceConnection("no active connection".to_string()))
    }

    async fn abandon(&self, request: &AudioRequest, err: AudioError) -> PlaybackEnd {
        error!("❌ No se pudo reproducir {}: {}", request.title, err);
        let notice = format!(
            "Skipping {} as an error occurred while creating audio resource.",
            request.title
        );
        if let Err(e) = self.notifier.post_notice(&notice).await {
            warn!("No se pudo publicar el aviso: {}", e);
        }
        PlaybackEnd::Failed
    }

    async fn complete(&self, request: &AudioRequest, end: PlaybackEnd) {
        self.state.send_replace(PlaybackState::Completing {
            title: request.title.clone(),
        });
        *self.stop_current.lock() = None;

        if end == PlaybackEnd::Skipped {
            self.refresh_status(true).await;
        }
        if let Err(e) = self.store.finish_current().await {
            warn!("No se pudo cerrar {}: {}", request.title, e);
        }
        info!("⏹️ Terminado {}: {:?}", request.title, end);
    }

    /// Re-renders the status line of the current request.
    pub async fn refresh_status(&self, skipped: bool) {
        let (Some(current), Some(status)) = (
            self.store.current_request().await,
            self.store.status_ref().await,
        ) else {
            return;
        };

        let content = now_playing(&current, self.store.skip_quorum().await, skipped);
        if let Err(e) = self.notifier.edit_status(status, &content).await {
            warn!("No se pudo actualizar el estado de {}: {}", current.title, e);
        }
    }

    /// Stops the current request, whatever phase it is in. Returns `false`
    /// when nothing was playing or it was already being stopped.
    pub fn force_stop(&self) -> bool {
        match self.stop_current.lock().as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }
}
