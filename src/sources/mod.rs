pub mod direct_url;
pub mod youtube;

use songbird::input::Input;
use std::time::Duration;
use tracing::info;

pub use direct_url::DirectUrlClient;
pub use youtube::YouTubeClient;

use crate::{
    audio::request::{AudioRequest, SourceKind},
    error::AudioError,
};

/// Builds songbird inputs for queued requests.
pub struct InputFactory {
    http: reqwest::Client,
    direct: DirectUrlClient,
    timeout: Duration,
}

impl InputFactory {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            direct: DirectUrlClient::new(http.clone()),
            http,
            timeout,
        }
    }

    pub async fn create(&self, request: &AudioRequest) -> Result<Input, AudioError> {
        info!(
            "🎵 Creando input ({}) para: {}",
            request.kind.as_str(),
            request.title
        );

        let pending = async {
            match request.kind {
                SourceKind::Streamed => youtube::streamed_input(self.http.clone(), &request.url).await,
                SourceKind::Direct => self.direct.create_input(&request.url).await,
            }
        };

        match tokio::time::timeout(self.timeout, pending).await {
            Ok(input) => input.map_err(|e| AudioError::resource(&request.url, e)),
            Err(_) => Err(AudioError::resource(
                &request.url,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}
