use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use super::ModelBundle;
use crate::errors::PredictorError;

/// Process-lifetime holder for the trained model.
///
/// The bundle is built lazily by the first caller of [`ModelStore::get_or_try_init`]
/// and reused until [`ModelStore::invalidate`] is called. The slot lock is held
/// while building so concurrent callers never train twice.
#[derive(Default)]
pub struct ModelStore {
    slot: Mutex<Option<Arc<ModelBundle>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<ModelBundle>>> {
        // a panic while training leaves the slot empty, which is still consistent
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the stored bundle, building it with `init` if the store is empty.
    /// A failed `init` leaves the store empty.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<ModelBundle>, PredictorError>
    where
        F: FnOnce() -> Result<ModelBundle, PredictorError>,
    {
        let mut slot = self.lock();
        if let Some(bundle) = slot.as_ref() {
            debug!("Reusing cached model bundle");
            return Ok(bundle.clone());
        }

        let bundle = Arc::new(init()?);
        *slot = Some(bundle.clone());
        info!("Model bundle initialized");
        Ok(bundle)
    }

    pub fn get(&self) -> Option<Arc<ModelBundle>> {
        self.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the stored bundle so the next access rebuilds it.
    pub fn invalidate(&self) -> Option<Arc<ModelBundle>> {
        let evicted = self.lock().take();
        if evicted.is_some() {
            info!("Model bundle invalidated");
        }
        evicted
    }
}
