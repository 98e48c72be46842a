use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{audio::store::QueueState, error::AudioError};

const STATE_FILE: &str = "audio_queue.json";

/// Durable home of the queue document.
///
/// `save` must either persist the whole state or fail without side effects
/// visible to a later `load`.
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn load(&self) -> Result<QueueState, AudioError>;
    async fn save(&self, state: &QueueState) -> Result<(), AudioError>;
}

/// JSON file backend. Survives restarts of the bot process.
pub struct JsonStorage {
    data_dir: PathBuf,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self, AudioError> {
        fs::create_dir_all(&data_dir)
            .await
            .map_err(AudioError::store)?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }
}

#[async_trait]
impl StateBackend for JsonStorage {
    async fn load(&self) -> Result<QueueState, AudioError> {
        let path = self.state_path();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No queue state at {}, starting empty", path.display());
                return Ok(QueueState::default());
            }
            Err(e) => return Err(AudioError::store(e)),
        };

        match serde_json::from_str::<QueueState>(&content) {
            Ok(state) => {
                info!(
                    "📂 Cola restaurada: {} pendientes, actual: {}",
                    state.queue.len(),
                    state.current.as_ref().map_or("-", |r| r.title.as_str())
                );
                Ok(state)
            }
            Err(e) => {
                // Keep the unreadable document around for inspection.
                let aside = path.with_extension("json.corrupt");
                warn!(
                    "Queue state at {} is unreadable ({}), moving it to {}",
                    path.display(),
                    e,
                    aside.display()
                );
                fs::rename(&path, &aside)
                    .await
                    .map_err(AudioError::store)?;
                Ok(QueueState::default())
            }
        }
    }

    async fn save(&self, state: &QueueState) -> Result<(), AudioError> {
        let path = self.state_path();
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(state).map_err(AudioError::store)?;
        fs::write(&tmp, content).await.map_err(AudioError::store)?;
        fs::rename(&tmp, &path).await.map_err(AudioError::store)?;

        Ok(())
    }
}

/// Backend that keeps the last saved document in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    saved: parking_lot::Mutex<QueueState>,
    failing: std::sync::atomic::AtomicBool,
    saves_left: parking_lot::Mutex<Option<usize>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Accepts `saves` more writes, then fails every one after. `None`
    /// lifts the limit.
    pub fn limit_saves(&self, saves: Option<usize>) {
        *self.saves_left.lock() = saves;
    }

    pub fn saved(&self) -> QueueState {
        self.saved.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl StateBackend for MemoryStorage {
    async fn load(&self) -> Result<QueueState, AudioError> {
        Ok(self.saved.lock().clone())
    }

    async fn save(&self, state: &QueueState) -> Result<(), AudioError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AudioError::StoreUnavailable("backend offline".into()));
        }
        if let Some(left) = self.saves_left.lock().as_mut() {
            if *left == 0 {
                return Err(AudioError::StoreUnavailable("backend full".into()));
            }
            *left -= 1;
        }
        *self.saved.lock() = state.clone();
        Ok(())
    }
}
