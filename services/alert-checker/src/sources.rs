//! Reading sources for the alert checker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use air_common::{AirError, AirResult, Reading, Station};
use alerting::User;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::SourceConfig;

/// Stations and their readings as delivered by a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingBatch {
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Anything that can deliver the current station network and readings.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn fetch(&self) -> AirResult<ReadingBatch>;
}

/// Reads a [`ReadingBatch`] JSON document on every fetch.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReadingSource for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch(&self) -> AirResult<ReadingBatch> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AirError::persistence(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let batch: ReadingBatch = serde_json::from_str(&content).map_err(|e| {
            AirError::validation(format!("invalid readings file {}: {}", self.path.display(), e))
        })?;

        info!(
            stations = batch.stations.len(),
            readings = batch.readings.len(),
            "Loaded readings"
        );
        Ok(batch)
    }
}

/// Returns the same batch every time.
pub struct StaticSource {
    batch: ReadingBatch,
}

impl StaticSource {
    pub fn new(stations: Vec<Station>, readings: Vec<Reading>) -> Self {
        Self {
            batch: ReadingBatch { stations, readings },
        }
    }
}

#[async_trait]
impl ReadingSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> AirResult<ReadingBatch> {
        debug!(stations = self.batch.stations.len(), "Serving static readings");
        Ok(self.batch.clone())
    }
}

/// Build the source selected by configuration.
pub fn create_source(config: &SourceConfig) -> Arc<dyn ReadingSource> {
    match config {
        SourceConfig::JsonFile { path } => Arc::new(JsonFileSource::new(path.clone())),
        SourceConfig::Static { stations, readings } => {
            Arc::new(StaticSource::new(stations.clone(), readings.clone()))
        }
    }
}

/// Load a JSON array of users.
pub async fn load_users(path: &Path) -> AirResult<Vec<User>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AirError::persistence(format!("failed to read {}: {}", path.display(), e)))?;
    let users: Vec<User> = serde_json::from_str(&content)
        .map_err(|e| AirError::validation(format!("invalid users file {}: {}", path.display(), e)))?;
    info!(users = users.len(), path = %path.display(), "Loaded users");
    Ok(users)
}
