use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use super::ServiceError;
use crate::api::{Dictionary, DictionaryValues};
use crate::db::{StaffingStore, StoreError};
use crate::validation::DictionaryLookup;

/// Outcome of a seed-directory pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Clone, Copy)]
pub struct DictionaryService<'a> {
    store: &'a dyn StaffingStore,
}

impl<'a> DictionaryService<'a> {
    pub fn new(store: &'a dyn StaffingStore) -> Self {
        Self { store }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Dictionary, ServiceError> {
        self.store
            .find_dictionary(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Dictionary \"{name}\" not found")))
    }

    /// Insert `values` under `name` unless that dictionary already exists.
    pub async fn seed(&self, name: &str, values: DictionaryValues) -> Result<bool, ServiceError> {
        let dictionary = Dictionary {
            name: name.to_string(),
            values,
        };
        let inserted = self.store.insert_dictionary_if_absent(&dictionary).await?;
        if inserted {
            info!(dictionary = name, entries = dictionary.values.len(), "seeded dictionary");
        }
        Ok(inserted)
    }

    /// Seed one dictionary per `*.json` file in `dir`, named after the file
    /// stem. Failures are logged and never abort the pass.
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn seed_from_dir(&self, dir: &Path) -> SeedReport {
        let mut report = SeedReport::default();

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(error = %err, "failed to read seed data directory");
                return report;
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        files.push(path);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to list seed data directory");
                    break;
                }
            }
        }
        files.sort();

        for path in files {
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string)
            else {
                warn!(path = %path.display(), "skipping seed file without a usable name");
                continue;
            };

            let values = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => match serde_json::from_str::<DictionaryValues>(&raw) {
                    Ok(values) => values,
                    Err(err) => {
                        error!(dictionary = %name, error = %err, "invalid seed file");
                        report.failed.push(name);
                        continue;
                    }
                },
                Err(err) => {
                    error!(dictionary = %name, error = %err, "failed to read seed file");
                    report.failed.push(name);
                    continue;
                }
            };

            match self.seed(&name, values).await {
                Ok(true) => report.inserted.push(name),
                Ok(false) => report.skipped.push(name),
                Err(err) => {
                    error!(dictionary = %name, error = %err, "failed to seed dictionary");
                    report.failed.push(name);
                }
            }
        }

        report
    }
}

#[async_trait]
impl DictionaryLookup for DictionaryService<'_> {
    async fn find_by_name(&self, name: &str) -> Result<Option<Dictionary>, StoreError> {
        self.store.find_dictionary(name).await
    }
}
