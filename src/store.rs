//! Persistence collaborator.
//!
//! The engine treats the store as an external service: a failed write never
//! invalidates an in-memory workflow result, it only produces a warning.
//! [`JsonFileStore`] keeps everything as JSON files under one directory.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::StoreError;
use crate::model::{ApplicationLog, UserProfile};
use crate::workflow::RiskState;

const PROFILE_FILE: &str = "profile.json";
const APPLICATIONS_FILE: &str = "applications.jsonl";
const RISK_FILE: &str = "risk.json";

#[allow(async_fn_in_trait)]
pub trait ApplicationStore {
    async fn persist_application_log(&self, log: &ApplicationLog) -> Result<(), StoreError>;

    async fn load_applications(&self) -> Result<Vec<ApplicationLog>, StoreError>;

    async fn persist_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn load_profile(&self) -> Result<Option<UserProfile>, StoreError>;

    async fn persist_risk(&self, risk: &RiskState) -> Result<(), StoreError>;

    async fn load_risk(&self) -> Result<Option<RiskState>, StoreError>;
}

/// Directory-backed store: `profile.json`, `risk.json` and an append-only
/// `applications.jsonl` (one [`ApplicationLog`] per line).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the data directory on first use. A plain file in its place
    /// makes the store unavailable rather than failing with a bare IO error.
    async fn ensure_root(&self) -> Result<(), StoreError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.root).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        self.ensure_root().await?;
        let target = self.root.join(file);
        let tmp = self.root.join(format!("{file}.tmp"));
        let body = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.root.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ApplicationStore for JsonFileStore {
    async fn persist_application_log(&self, log: &ApplicationLog) -> Result<(), StoreError> {
        self.ensure_root().await?;
        let mut line = serde_json::to_vec(log)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.root.join(APPLICATIONS_FILE))
            .await?;
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                line.insert(0, b'\n');
            }
        }
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_applications(&self) -> Result<Vec<ApplicationLog>, StoreError> {
        let path = self.root.join(APPLICATIONS_FILE);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // A crash mid-append leaves a torn last line; one bad entry must not
        // hide the rest of the log.
        let logs = contents
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .filter_map(|(idx, l)| match serde_json::from_str(l) {
                Ok(log) => Some(log),
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        line = idx + 1,
                        error = %e,
                        "skipping unreadable application log line"
                    );
                    None
                }
            })
            .collect();
        Ok(logs)
    }

    async fn persist_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.write_json(PROFILE_FILE, profile).await
    }

    async fn load_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        self.read_json(PROFILE_FILE).await
    }

    async fn persist_risk(&self, risk: &RiskState) -> Result<(), StoreError> {
        self.write_json(RISK_FILE, risk).await
    }

    async fn load_risk(&self) -> Result<Option<RiskState>, StoreError> {
        self.read_json(RISK_FILE).await
    }
}
