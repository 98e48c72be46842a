use async_trait::async_trait;
use serenity::{
    cache::Cache,
    model::id::{ChannelId, GuildId},
};
use songbird::{input::Input, tracks::TrackHandle, Call, Event, Songbird, TrackEvent};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    request::AudioRequest,
    transport::{PlaybackControl, PlaybackHandle, VoiceTransport},
};
use crate::{
    bot::events::{TrackEndHandler, TrackErrorHandler},
    error::AudioError,
    sources::InputFactory,
};

/// Input ready to be handed to the mixer.
pub struct PreparedInput {
    title: String,
    input: Input,
    start: Duration,
}

/// Voice transport backed by songbird, scoped to one guild.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    guild_id: GuildId,
    inputs: InputFactory,
    volume: f32,
}

impl SongbirdTransport {
    pub fn new(
        manager: Arc<Songbird>,
        cache: Arc<Cache>,
        guild_id: GuildId,
        inputs: InputFactory,
        volume: f32,
    ) -> Self {
        Self {
            manager,
            cache,
            guild_id,
            inputs,
            volume: volume.clamp(0.0, 2.0),
        }
    }
}

struct SongbirdTrack(TrackHandle);

impl PlaybackControl for SongbirdTrack {
    fn stop(&self) {
        // Stopping an already finished track only reports that it finished.
        let _ = self.0.stop();
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    type Connection = Arc<Mutex<Call>>;
    type Source = PreparedInput;

    async fn open_source(&self, request: &AudioRequest) -> Result<PreparedInput, AudioError> {
        let input = self.inputs.create(request).await?;
        Ok(PreparedInput {
            title: request.title.clone(),
            input,
            start: request.start_offset(),
        })
    }

    async fn join_channel(&self, channel_id: ChannelId) -> Result<Arc<Mutex<Call>>, AudioError> {
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| AudioError::VoiceConnection(e.to_string()))
    }

    async fn attach_and_play(
        &self,
        connection: &Arc<Mutex<Call>>,
        source: PreparedInput,
    ) -> Result<PlaybackHandle, AudioError> {
        let track = {
            let mut call = connection.lock().await;
            call.play_input(source.input)
        };

        if let Err(e) = track.set_volume(self.volume) {
            warn!("No se pudo ajustar el volumen de {}: {}", source.title, e);
        }
        if !source.start.is_zero() {
            debug!("⏩ {} desde {:?}", source.title, source.start);
            // The seek resolves once the input is ready; errors surface as a
            // track error event.
            let _ = track.seek(source.start);
        }

        let (handle, ended) = PlaybackHandle::new(SongbirdTrack(track.clone()));
        let title = source.title;

        track
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndHandler {
                    title: title.clone(),
                    ended: ended.clone(),
                },
            )
            .map_err(|e| AudioError::resource(&title, e))?;
        track
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorHandler {
                    title: title.clone(),
                    ended,
                },
            )
            .map_err(|e| AudioError::resource(&title, e))?;

        Ok(handle)
    }

    async fn disconnect(&self, _connection: Arc<Mutex<Call>>) {
        match self.manager.remove(self.guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", self.guild_id),
            Err(e) => warn!("Error al desconectar de guild {}: {}", self.guild_id, e),
        }
    }

    async fn channel_occupancy(&self, channel_id: ChannelId) -> usize {
        let bot_id = self.cache.current_user().id;
        self.cache
            .guild(self.guild_id)
            .map(|guild| {
                guild
                    .voice_states
                    .values()
                    .filter(|state| state.channel_id == Some(channel_id))
                    .filter(|state| state.user_id != bot_id)
                    .filter(|state| !state.member.as_ref().is_some_and(|m| m.user.bot))
                    .count()
            })
            .unwrap_or(0)
    }
}
