//! In-memory watermark store for testing.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::watermark::{Watermark, WatermarkError, WatermarkStore};

/// Watermark store kept in memory, with save-failure injection.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Option<Watermark>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(watermark: Watermark) -> Self {
        Self {
            value: Mutex::new(Some(watermark)),
            ..Self::default()
        }
    }

    /// Stored value, if any was set or saved.
    pub fn current(&self) -> Option<Watermark> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every save fail until switched back.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self) -> Watermark {
        self.current().unwrap_or_default()
    }

    fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(WatermarkError::Io(io::Error::other("simulated save failure")));
        }
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(*watermark);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
