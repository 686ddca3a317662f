//! File-backed raw record store: one JSON document per external ID,
//! upserted atomically, grouped by entity collection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use starpath_core::{EntityType, RawRecord};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

pub const CRATE_NAME: &str = "starpath-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("raw record has an empty external_id")]
    MissingExternalId,
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding record {external_id}: {source}")]
    Encode {
        external_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub external_id: String,
    pub inserted: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityCounts {
    pub records: usize,
    pub last_extracted_at: Option<DateTime<Utc>>,
}

/// Keyed store over `root/<entity>/<external_id>.json`. Writes go through a
/// temp file and an atomic rename, so readers never observe a torn record.
#[derive(Debug, Clone)]
pub struct RawRecordStore {
    root: PathBuf,
}

impl RawRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_dir(&self, entity: EntityType) -> PathBuf {
        self.root.join(entity.as_str())
    }

    fn record_path(&self, entity: EntityType, external_id: &str) -> PathBuf {
        self.entity_dir(entity)
            .join(format!("{}.json", sanitize_id(external_id)))
    }

    /// Insert or supersede the record for its external ID. Returns whether
    /// this was a first write or a replacement.
    pub async fn upsert(
        &self,
        entity: EntityType,
        record: &RawRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        if record.external_id.trim().is_empty() {
            return Err(StoreError::MissingExternalId);
        }

        let path = self.record_path(entity, &record.external_id);
        let parent = self.entity_dir(entity);
        fs::create_dir_all(&parent).await.map_err(|source| StoreError::Io {
            path: parent.clone(),
            source,
        })?;

        let existed = fs::try_exists(&path).await.map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Encode {
            external_id: record.external_id.clone(),
            source,
        })?;

        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;
        if let Err(source) = file.write_all(&bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Io {
                path: temp_path,
                source,
            });
        }
        if let Err(source) = file.flush().await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Io {
                path: temp_path,
                source,
            });
        }
        drop(file);

        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Io { path, source });
        }

        Ok(UpsertOutcome {
            external_id: record.external_id.clone(),
            inserted: !existed,
            path,
        })
    }

    pub async fn upsert_all(
        &self,
        entity: EntityType,
        records: &[RawRecord],
    ) -> Result<UpsertSummary, StoreError> {
        let mut summary = UpsertSummary::default();
        for record in records {
            let outcome = self.upsert(entity, record).await?;
            if outcome.inserted {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }
        Ok(summary)
    }

    /// Every current record for the entity, in arbitrary order. A missing
    /// collection directory means no records yet, not an error.
    pub async fn fetch_all(&self, entity: EntityType) -> Result<Vec<RawRecord>, StoreError> {
        let dir = self.entity_dir(entity);
        if !fs::try_exists(&dir).await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })? {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir).await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })? {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                // Temp files from in-flight writes are not records.
                continue;
            }
            let bytes = fs::read(&path).await.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let record: RawRecord =
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                    path: path.clone(),
                    source,
                })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Per-entity record counts and latest extraction timestamps.
    pub async fn counts(&self) -> Result<BTreeMap<&'static str, EntityCounts>, StoreError> {
        let mut out = BTreeMap::new();
        for entity in EntityType::ALL {
            let records = self.fetch_all(entity).await?;
            let last_extracted_at = records.iter().map(|r| r.extracted_at).max();
            if records.is_empty() {
                warn!(entity = entity.as_str(), "store has no records for entity");
            }
            out.insert(
                entity.as_str(),
                EntityCounts {
                    records: records.len(),
                    last_extracted_at,
                },
            );
        }
        Ok(out)
    }
}

fn sanitize_id(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}
