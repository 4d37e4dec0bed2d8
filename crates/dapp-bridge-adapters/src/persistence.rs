use std::sync::{Arc, Mutex, PoisonError};

use dapp_bridge_core::{PersistencePort, PortError, WalletAsset};

/// Asset store kept for the lifetime of the process. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    assets: Arc<Mutex<Vec<WalletAsset>>>,
}

impl InMemoryPersistence {
    pub fn assets(&self) -> Vec<WalletAsset> {
        self.assets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PersistencePort for InMemoryPersistence {
    async fn save_assets(&self, assets: &[WalletAsset]) -> Result<(), PortError> {
        let mut stored = self.assets.lock().unwrap_or_else(PoisonError::into_inner);
        for asset in assets {
            // Re-saving an identical record is a no-op.
            if !stored.contains(asset) {
                stored.push(asset.clone());
            }
        }
        tracing::debug!(total = stored.len(), "assets saved");
        Ok(())
    }
}
