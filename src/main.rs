use anyhow::Result;
use serenity::{
    model::{
        gateway::GatewayIntents,
        id::{ChannelId, GuildId},
    },
    Client,
};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod storage;
mod ui;

use crate::audio::{
    classifier::RequestClassifier, jukebox::Jukebox, player::SongbirdTransport, store::QueueStore,
};
use crate::bot::{notifier::ChannelNotifier, JukeboxKey, PartyBot};
use crate::config::Config;
use crate::sources::{InputFactory, YouTubeClient};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("party_queue=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Party Queue v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Restaurar la cola persistida
    let storage = Arc::new(JsonStorage::new(config.data_dir.clone()).await?);
    let store = Arc::new(QueueStore::open(storage).await?);

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Construir cliente
    let songbird = Songbird::serenity();
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(PartyBot::new(config.clone()))
        .register_songbird_with(songbird.clone())
        .await?;

    // Sin timeout total: el cuerpo de la respuesta es el stream de audio
    let http_client = reqwest::Client::builder()
        .connect_timeout(config.source_timeout())
        .build()?;
    let transport = SongbirdTransport::new(
        songbird,
        client.cache.clone(),
        GuildId::new(config.guild_id),
        InputFactory::new(http_client, config.source_timeout()),
        config.default_volume,
    );
    let notifier = Arc::new(ChannelNotifier::new(
        client.http.clone(),
        ChannelId::new(config.bot_channel_id),
    ));
    let classifier = RequestClassifier::new(
        Arc::new(YouTubeClient::new(config.source_timeout())),
        config.max_playlist_size,
    );

    let jukebox = Jukebox::new(
        classifier,
        store,
        transport,
        notifier,
        config.playback_settings(),
    );
    {
        let mut data = client.data.write().await;
        data.insert::<JukeboxKey>(jukebox);
    }

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    let version = YouTubeClient::version().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
