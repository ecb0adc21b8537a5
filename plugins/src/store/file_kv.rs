use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use uniflow_core::api::KeyValueStore;

/// Key-value store persisted as one JSON object file.
///
/// Values that are JSON objects or arrays are embedded as-is so the file
/// stays readable; anything else is kept as a JSON string. Writes go to a
/// sibling temp file which is then renamed over the original.
pub struct FileKvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `~/.uniflow/settings.json`
    pub fn default_location() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(Self::new(home.join(".uniflow").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> anyhow::Result<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)
            .with_context(|| format!("parse {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} is not a JSON object", self.path.display()),
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }

        let body = serde_json::to_string_pretty(map)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn encode(value: String) -> Value {
    match serde_json::from_str::<Value>(&value) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => v,
        _ => Value::String(value),
    }
}

fn decode(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let map = self.read_map().await?;
        Ok(map.get(key).map(decode))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), encode(value));
        self.write_map(&map).await?;
        tracing::debug!(target: "uniflow.store", key, path = %self.path.display(), "value saved");
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}
