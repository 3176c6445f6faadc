//! Watermark stored as a small JSON file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Watermark, WatermarkError, WatermarkStore};

/// Well-known file name inside the state directory.
pub const WATERMARK_FILE: &str = "crawl-watermark.json";

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    watermark: DateTime<Utc>,
}

/// File-backed watermark store.
///
/// Writes go to a sibling temp file which is fsynced and renamed over the
/// target, so a crash leaves either the old or the new value.
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`WATERMARK_FILE`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(WATERMARK_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self) -> Watermark {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No watermark at {:?}, starting from epoch", self.path);
                return Watermark::epoch();
            }
            Err(e) => {
                warn!(
                    "Failed to read watermark from {:?}, starting from epoch: {}",
                    self.path, e
                );
                return Watermark::epoch();
            }
        };

        match serde_json::from_str::<WatermarkFile>(&content) {
            Ok(file) => Watermark::new(file.watermark),
            Err(e) => {
                warn!(
                    "Corrupt watermark file {:?}, starting from epoch: {}",
                    self.path, e
                );
                Watermark::epoch()
            }
        }
    }

    fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec_pretty(&WatermarkFile {
            watermark: watermark.timestamp(),
        })
        .map_err(|e| WatermarkError::Serialization(e.to_string()))?;

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!("Watermark saved to {:?}: {}", self.path, watermark);
        Ok(())
    }
}
