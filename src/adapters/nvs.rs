//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ModeStore`]: the arming mode survives reboots so the
//! panel re-arms itself after a power cut. The stored payload is a
//! postcard-encoded record, versioned by its namespace key.
//!
//! On ESP32 the value lives in the default NVS partition; NVS commits are
//! atomic, so a power loss mid-write leaves the previous mode intact.
//! The simulation backend is an in-memory byte buffer (dev/test only).

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::mode::AlarmMode;
use crate::ports::ModeStore;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

const NVS_NAMESPACE: &str = "homeguard";
const MODE_KEY: &str = "mode";

/// Persisted panel state. Kept as a struct so future fields (buzzer
/// switch, per-zone overrides) extend the blob without a key migration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredState {
    mode: u8,
}

pub struct NvsModeStore {
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsModeStore {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StoreError> {
        let partition = EspDefaultNvsPartition::take().map_err(|e| {
            warn!("NVS | partition take failed: {e}");
            StoreError::IoError
        })?;
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(|e| {
            warn!("NVS | namespace open failed: {e}");
            StoreError::IoError
        })?;
        info!("NVS | mode store ready");
        Ok(Self { nvs })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StoreError> {
        info!("NVS | simulation backend");
        Ok(Self {
            blob: std::cell::RefCell::new(None),
        })
    }

    fn encode(mode: AlarmMode) -> Result<Vec<u8>, StoreError> {
        postcard::to_allocvec(&StoredState { mode: mode as u8 }).map_err(|_| StoreError::IoError)
    }

    fn decode(bytes: &[u8]) -> Result<AlarmMode, StoreError> {
        let state: StoredState =
            postcard::from_bytes(bytes).map_err(|_| StoreError::Corrupted)?;
        AlarmMode::from_index(state.mode).ok_or(StoreError::Corrupted)
    }
}

impl ModeStore for NvsModeStore {
    #[cfg(target_os = "espidf")]
    fn store(&mut self, mode: AlarmMode) -> Result<(), StoreError> {
        let bytes = Self::encode(mode)?;
        self.nvs.set_blob(MODE_KEY, &bytes).map_err(|e| {
            warn!("NVS | mode write failed: {e}");
            StoreError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn store(&mut self, mode: AlarmMode) -> Result<(), StoreError> {
        *self.blob.borrow_mut() = Some(Self::encode(mode)?);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn load(&self) -> Option<AlarmMode> {
        let mut buf = [0u8; 16];
        let bytes = self.nvs.get_blob(MODE_KEY, &mut buf).ok().flatten()?;
        match Self::decode(bytes) {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!("NVS | stored mode unreadable: {e}");
                None
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn load(&self) -> Option<AlarmMode> {
        let blob = self.blob.borrow();
        let bytes = blob.as_ref()?;
        match Self::decode(bytes) {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!("NVS | stored mode unreadable: {e}");
                None
            }
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn store_then_load_roundtrip() {
        let mut s = NvsModeStore::new().unwrap();
        assert_eq!(s.load(), None);
        s.store(AlarmMode::Perimeter).unwrap();
        assert_eq!(s.load(), Some(AlarmMode::Perimeter));
        s.store(AlarmMode::Disabled).unwrap();
        assert_eq!(s.load(), Some(AlarmMode::Disabled));
    }

    #[test]
    fn corrupted_blob_reads_as_none() {
        let s = NvsModeStore::new().unwrap();
        *s.blob.borrow_mut() = Some(vec![0xFF, 0xFF, 0xFF]);
        assert_eq!(s.load(), None);
    }
}
