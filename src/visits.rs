use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum VisitError {
    #[error("cannot write visit counts: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode visit counts: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisitCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitUpdate {
    pub path: String,
    pub total: u64,
    pub page_total: u64,
    pub pages: BTreeMap<String, u64>,
}

/// Site-wide and per-path visit totals kept in a small JSON file.
pub struct VisitCounter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl VisitCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    async fn read(&self) -> VisitCounts {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Visit counts at {} unreadable, starting over: {}", self.path.display(), e);
                VisitCounts::default()
            }),
            Err(_) => VisitCounts::default(),
        }
    }

    async fn write(&self, counts: &VisitCounts) -> Result<(), VisitError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(counts)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn increment(&self, path: Option<&str>) -> Result<VisitUpdate, VisitError> {
        let normalized = normalize_path(path);
        let _guard = self.lock.lock().await;
        let mut counts = self.read().await;
        counts.total += 1;
        let page_total = {
            let page = counts.pages.entry(normalized.clone()).or_insert(0);
            *page += 1;
            *page
        };
        self.write(&counts).await?;
        Ok(VisitUpdate { path: normalized, total: counts.total, page_total, pages: counts.pages })
    }

    pub async fn counts(&self) -> VisitCounts {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}

pub fn normalize_path(path: Option<&str>) -> String {
    let trimmed = path.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path(None), "/");
        assert_eq!(normalize_path(Some("  ")), "/");
        assert_eq!(normalize_path(Some("places")), "/places");
        assert_eq!(normalize_path(Some("/places/1")), "/places/1");
    }

    #[tokio::test]
    async fn increments_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("visits.json");
        let counter = VisitCounter::new(&file);
        counter.increment(Some("/")).await.unwrap();
        let update = counter.increment(Some("places")).await.unwrap();
        assert_eq!(update.total, 2);
        assert_eq!(update.page_total, 1);

        let reopened = VisitCounter::new(&file);
        let counts = reopened.counts().await;
        assert_eq!(counts.total, 2);
        assert_eq!(counts.pages.get("/places"), Some(&1));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("visits.json");
        std::fs::write(&file, "not json").unwrap();
        let counter = VisitCounter::new(&file);
        assert_eq!(counter.counts().await, VisitCounts::default());
        assert_eq!(counter.increment(None).await.unwrap().total, 1);
    }
}
