//! Entity services. `Staffing` owns the store handle and hands out borrowed
//! per-entity views; all cross-entity writes go through [`RelationCoordinator`].

pub mod dictionary;
pub mod employees;
pub mod projects;
pub mod relations;
pub mod requests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::api::EntityKind;
use crate::db::{StaffingStore, StoreError};
use crate::validation::ValidationError;

pub use dictionary::{DictionaryService, SeedReport};
pub use employees::EmployeeService;
pub use projects::ProjectService;
pub use relations::RelationCoordinator;
pub use requests::RequestService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ServiceError::Conflict(message),
            other => ServiceError::Storage(other),
        }
    }
}

pub fn not_found(kind: EntityKind, id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{} with ID \"{id}\" not found", kind.label()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffingOptions {
    /// Check request skills, technologies and location against seeded dictionaries.
    pub dictionary_validation: bool,
}

impl Default for StaffingOptions {
    fn default() -> Self {
        Self {
            dictionary_validation: true,
        }
    }
}

#[derive(Clone)]
pub struct Staffing {
    store: Arc<dyn StaffingStore>,
    options: StaffingOptions,
}

impl Staffing {
    pub fn new(store: Arc<dyn StaffingStore>, options: StaffingOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &dyn StaffingStore {
        self.store.as_ref()
    }

    pub fn options(&self) -> StaffingOptions {
        self.options
    }

    pub fn employees(&self) -> EmployeeService<'_> {
        EmployeeService::new(self.store(), self.relations())
    }

    pub fn projects(&self) -> ProjectService<'_> {
        ProjectService::new(self.store(), self.relations())
    }

    pub fn requests(&self) -> RequestService<'_> {
        RequestService::new(self.store(), self.relations(), self.dictionaries(), self.options)
    }

    pub fn relations(&self) -> RelationCoordinator<'_> {
        RelationCoordinator::new(self.store())
    }

    pub fn dictionaries(&self) -> DictionaryService<'_> {
        DictionaryService::new(self.store())
    }
}

/// Single-item create goes through the batch path; the batch echoes one record back.
pub(crate) fn first_created<T>(created: Vec<T>) -> Result<T, ServiceError> {
    created
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::Storage(StoreError::Mapping("insert returned no record".into())))
}

/// Distinct ids across all reference lists, first occurrence wins.
pub(crate) fn unique_ids<'a>(lists: impl IntoIterator<Item = &'a [Uuid]>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

pub(crate) fn index_by_id<T>(items: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

/// Resolve ids against an index; ids with no record are dropped.
pub(crate) fn pick<T: Clone>(index: &HashMap<Uuid, T>, ids: &[Uuid]) -> Vec<T> {
    ids.iter().filter_map(|id| index.get(id).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_surface_as_service_conflicts() {
        let err: ServiceError = StoreError::Conflict("taken".into()).into();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "taken"));

        let err: ServiceError = StoreError::Mapping("bad row".into()).into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let id = Uuid::nil();
        let err = not_found(EntityKind::Project, id);
        assert_eq!(err.to_string(), format!("Project with ID \"{id}\" not found"));
    }

    #[test]
    fn pick_drops_dangling_ids() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let index = index_by_id(vec![a], |id| *id);
        assert_eq!(pick(&index, &[b, a]), vec![a]);

        let ids = unique_ids([&[a, b][..], &[b, a][..]]);
        assert_eq!(ids, vec![a, b]);
    }
}
