use crate::models::Habit;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::error;

/// On-disk layout of the local habit cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheFile {
    #[serde(default)]
    pub habits: Vec<Habit>,
}

pub async fn load_cache(path: &Path) -> Vec<Habit> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<CacheFile>(&bytes) {
            Ok(cache) => cache.habits,
            Err(err) => {
                error!("failed to parse cache file: {err}");
                Vec::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            error!("failed to read cache file: {err}");
            Vec::new()
        }
    }
}

pub async fn persist_cache(path: &Path, habits: &[Habit]) -> Result<(), std::io::Error> {
    let cache = CacheFile {
        habits: habits.to_vec(),
    };
    let payload = serde_json::to_vec_pretty(&cache)?;
    fs::write(path, payload).await
}
