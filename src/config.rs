use crate::gateway::{FileRecordStore, MemoryRecordStore, RecordBackend};
use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBackend {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub cache_path: PathBuf,
    pub remote: RemoteBackend,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let cache_path = lookup("APP_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/cache.json"));
        let remote_path = lookup("APP_REMOTE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/habits.json"));

        let remote = match lookup("APP_REMOTE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("file") => RemoteBackend::File(remote_path),
            Some("memory") => RemoteBackend::Memory,
            Some(other) => {
                return Err(format!(
                    "APP_REMOTE_BACKEND must be 'file' or 'memory', got '{other}'"
                ));
            }
        };

        Ok(Self {
            port,
            cache_path,
            remote,
        })
    }

    pub fn record_backend(&self) -> RecordBackend {
        match &self.remote {
            RemoteBackend::File(path) => RecordBackend::File(FileRecordStore::new(path.clone())),
            RemoteBackend::Memory => RecordBackend::Memory(MemoryRecordStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_path, PathBuf::from("data/cache.json"));
        assert_eq!(
            config.remote,
            RemoteBackend::File(PathBuf::from("data/habits.json"))
        );
    }

    #[test]
    fn env_overrides_are_read() {
        let config = config(&[
            ("PORT", "9090"),
            ("APP_CACHE_PATH", "/tmp/c.json"),
            ("APP_REMOTE_BACKEND", "memory"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.cache_path, PathBuf::from("/tmp/c.json"));
        assert_eq!(config.remote, RemoteBackend::Memory);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(config(&[("APP_REMOTE_BACKEND", "mongo")]).is_err());
    }
}
