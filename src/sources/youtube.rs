use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use songbird::input::{Compose, Input, YoutubeDl};
use std::process::Output;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::audio::classifier::MetadataResolver;

/// Metadata lookups through yt-dlp.
pub struct YouTubeClient {
    // Limitar procesos concurrentes de yt-dlp para evitar rate limiting
    rate_limiter: Semaphore,
    timeout: Duration,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
}

/// Una entrada de `--flat-playlist`
#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    id: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl PlaylistEntry {
    fn watch_url(self) -> Option<String> {
        self.webpage_url
            .filter(|u| u.starts_with("http"))
            .or_else(|| self.url.filter(|u| u.starts_with("http")))
            .or_else(|| self.id.map(|id| format!("https://www.youtube.com/watch?v={}", id)))
    }
}

impl YouTubeClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            rate_limiter: Semaphore::new(3),
            timeout,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let _permit = self.rate_limiter.acquire().await?;

        let output = tokio::time::timeout(self.timeout, Command::new("yt-dlp").args(args).output())
            .await
            .with_context(|| format!("yt-dlp no respondió en {:?}", self.timeout))?
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }
        Ok(output)
    }

    /// Versión instalada de yt-dlp, usada por el health check.
    pub async fn version() -> Result<String> {
        let output = Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await
            .context("yt-dlp no está instalado o no está en PATH")?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp no puede ejecutarse correctamente");
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl MetadataResolver for YouTubeClient {
    async fn resolve_title(&self, url: &str) -> Result<String> {
        debug!("📊 Obteniendo info de: {}", url);

        let output = self
            .run(&["--no-playlist", "--dump-json", "--skip-download", "--no-warnings", url])
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info: YtDlpInfo =
            serde_json::from_str(&stdout).context("Error al parsear respuesta de yt-dlp")?;
        Ok(info.title)
    }

    async fn list_collection(&self, url: &str, limit: usize) -> Result<Vec<String>> {
        info!("📋 Obteniendo playlist: {}", url);

        let limit = limit.to_string();
        let output = self
            .run(&[
                "--flat-playlist",
                "--dump-json",
                "--playlist-end",
                &limit,
                "--no-warnings",
                url,
            ])
            .await?;

        Ok(parse_playlist(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_playlist(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<PlaylistEntry>(line).ok())
        .filter_map(PlaylistEntry::watch_url)
        .collect()
}

/// Songbird input for a platform link. The metadata probe runs yt-dlp once so
/// an unavailable video fails here rather than inside the mixer.
pub async fn streamed_input(client: reqwest::Client, url: &str) -> Result<Input> {
    let mut ytdl = YoutubeDl::new(client, url.to_string());
    let metadata = ytdl
        .aux_metadata()
        .await
        .map_err(|e| anyhow::anyhow!("yt-dlp no pudo abrir {}: {}", url, e))?;
    debug!(
        "🎬 Stream listo: {}",
        metadata.title.as_deref().unwrap_or(url)
    );
    Ok(ytdl.into())
}
