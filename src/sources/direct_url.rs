use anyhow::Result;
use reqwest::{header::RANGE, StatusCode};
use songbird::input::{HttpRequest, Input};
use tracing::debug;

/// Cliente para archivos de audio servidos por HTTP
pub struct DirectUrlClient {
    client: reqwest::Client,
}

impl DirectUrlClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Checks the file answers before the player starts pulling it.
    pub async fn probe(&self, url: &str) -> Result<()> {
        let mut status = self.client.head(url).send().await?.status();

        // Algunos servidores no aceptan HEAD
        if status == StatusCode::METHOD_NOT_ALLOWED {
            status = self
                .client
                .get(url)
                .header(RANGE, "bytes=0-0")
                .send()
                .await?
                .status();
        }

        if !status.is_success() {
            anyhow::bail!("HTTP {}", status);
        }
        debug!("🔗 Archivo accesible: {} ({})", url, status);
        Ok(())
    }

    pub async fn create_input(&self, url: &str) -> Result<Input> {
        self.probe(url).await?;
        Ok(HttpRequest::new(self.client.clone(), url.to_string()).into())
    }
}
