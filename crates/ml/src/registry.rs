//! Holder of the single active model artifact.
//!
//! Readers clone an `Arc` to the active artifact under a short read lock, so a
//! load never blocks in-flight predictions: they finish against whichever
//! artifact they grabbed, and the next request sees the new one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use courtside_models::{CourtsideError, FeatureVector, ModelPrediction, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::artifact::{ArtifactStore, ModelArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryState {
    Unloaded,
    Loading,
    Ready,
}

/// Snapshot used by the health surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryHealth {
    pub state: RegistryState,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub model_name: Option<String>,
}

pub struct ModelRegistry {
    store: Arc<dyn ArtifactStore>,
    active: RwLock<Option<Arc<ModelArtifact>>>,
    load_guard: Mutex<()>,
    loading: AtomicBool,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            load_guard: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> Arc<dyn ArtifactStore> {
        Arc::clone(&self.store)
    }

    /// Reads `version` from the store and makes it the active artifact.
    /// On failure the previously active artifact (if any) stays in place.
    pub async fn load(&self, version: &str) -> Result<()> {
        let _guard = self.load_guard.lock().await;
        self.loading.store(true, Ordering::SeqCst);

        let loaded = self.store.load(version).await;
        self.loading.store(false, Ordering::SeqCst);

        match loaded {
            Ok(artifact) => {
                let previous = self.swap(Arc::new(artifact));
                info!(
                    version,
                    previous = previous.as_deref().unwrap_or("none"),
                    "Model artifact activated"
                );
                Ok(())
            }
            Err(e) => {
                error!(version, error = %e, "Failed to load model artifact");
                Err(e)
            }
        }
    }

    /// Reloads the currently active version from the store.
    pub async fn reload(&self) -> Result<()> {
        let version = self.current_version().ok_or(CourtsideError::NotLoaded)?;
        self.load(&version).await
    }

    /// Activates an artifact that is already in memory.
    pub async fn install(&self, artifact: ModelArtifact) {
        let _guard = self.load_guard.lock().await;
        let version = artifact.version().to_string();
        let previous = self.swap(Arc::new(artifact));
        info!(
            version = %version,
            previous = previous.as_deref().unwrap_or("none"),
            "Model artifact installed"
        );
    }

    fn swap(&self, artifact: Arc<ModelArtifact>) -> Option<String> {
        let mut active = self.active.write();
        let previous = active.as_ref().map(|a| a.version().to_string());
        *active = Some(artifact);
        previous
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<ModelPrediction> {
        self.current()?.predict(features)
    }

    /// Handle to the active artifact. Holding it pins that version for the
    /// duration of one request even if a swap happens meanwhile.
    pub fn current(&self) -> Result<Arc<ModelArtifact>> {
        self.active.read().clone().ok_or(CourtsideError::NotLoaded)
    }

    pub fn current_version(&self) -> Option<String> {
        self.active.read().as_ref().map(|a| a.version().to_string())
    }

    pub fn is_loaded(&self) -> bool {
        self.active.read().is_some()
    }

    pub fn state(&self) -> RegistryState {
        if self.loading.load(Ordering::SeqCst) {
            RegistryState::Loading
        } else if self.is_loaded() {
            RegistryState::Ready
        } else {
            RegistryState::Unloaded
        }
    }

    pub fn health(&self) -> RegistryHealth {
        let active = self.active.read().clone();
        RegistryHealth {
            state: self.state(),
            model_loaded: active.is_some(),
            model_version: active.as_ref().map(|a| a.version().to_string()),
            model_name: active.as_ref().map(|a| a.model_name().to_string()),
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("state", &self.state())
            .field("current_version", &self.current_version())
            .finish()
    }
}
