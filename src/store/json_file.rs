//! Backend decorator that also writes every saved record to disk as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::model::User;

use super::traits::{Candidate, OnboardingBackend, Provider, Record};

/// Saves through `inner`, then writes the record to `<dir>/<kind>-<uuid>.json`.
pub struct JsonFileBackend {
    inner: Arc<dyn OnboardingBackend>,
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Wrap `inner`, creating `dir` if needed.
    pub async fn new(
        inner: Arc<dyn OnboardingBackend>,
        dir: impl AsRef<Path>,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "Record directory ready");
        Ok(Self { inner, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read back every record written to `dir`. Unreadable files are errors.
    pub async fn load_all(dir: impl AsRef<Path>) -> Result<Vec<Record>, StoreError> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = tokio::fs::read_to_string(&path).await?;
            records.push(serde_json::from_str(&raw)?);
        }
        Ok(records)
    }

    async fn write(&self, record: &Record) -> Result<PathBuf, StoreError> {
        let path = self
            .dir
            .join(format!("{}-{}.json", record.kind(), Uuid::new_v4()));
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[async_trait]
impl OnboardingBackend for JsonFileBackend {
    async fn save(&self, candidate: Candidate) -> Result<Record, StoreError> {
        let record = self.inner.save(candidate).await?;
        let path = self.write(&record).await?;
        debug!(kind = record.kind(), path = %path.display(), "Record written");
        Ok(record)
    }

    async fn sign_in_with(&self, provider: Provider) -> Result<User, StoreError> {
        let user = self.inner.sign_in_with(provider).await?;
        self.write(&Record::User(user.clone())).await?;
        Ok(user)
    }
}
