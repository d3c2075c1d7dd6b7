use async_trait::async_trait;
use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use uuid::Uuid;

use crate::api::{
    CreateEmployee, CreateProject, CreateRequest, Dictionary, Employee, EmployeeFilter,
    EmployeePatch, EntityKind, Project, ProjectFilter, ProjectPatch, RequestFilter, RequestPatch,
    StaffingRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map row: {0}")]
    Mapping(String),
    #[error("{0}")]
    Conflict(String),
}

/// A reference field: the list (or slot) on an owner document holding ids of
/// documents of the target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefField {
    EmployeeProjects,
    EmployeeRequests,
    ProjectTeam,
    ProjectRequests,
    RequestAssignedEmployees,
    RequestProject,
}

impl RefField {
    pub const ALL: [RefField; 6] = [
        RefField::EmployeeProjects,
        RefField::EmployeeRequests,
        RefField::ProjectTeam,
        RefField::ProjectRequests,
        RefField::RequestAssignedEmployees,
        RefField::RequestProject,
    ];

    pub fn owner(self) -> EntityKind {
        match self {
            RefField::EmployeeProjects | RefField::EmployeeRequests => EntityKind::Employee,
            RefField::ProjectTeam | RefField::ProjectRequests => EntityKind::Project,
            RefField::RequestAssignedEmployees | RefField::RequestProject => EntityKind::Request,
        }
    }

    pub fn target(self) -> EntityKind {
        self.inverse().owner()
    }

    /// The field on the target document that mirrors this one.
    pub fn inverse(self) -> RefField {
        match self {
            RefField::EmployeeProjects => RefField::ProjectTeam,
            RefField::ProjectTeam => RefField::EmployeeProjects,
            RefField::EmployeeRequests => RefField::RequestAssignedEmployees,
            RefField::RequestAssignedEmployees => RefField::EmployeeRequests,
            RefField::ProjectRequests => RefField::RequestProject,
            RefField::RequestProject => RefField::ProjectRequests,
        }
    }

    /// Single-valued fields hold at most one id; adding replaces the current one.
    pub fn is_single(self) -> bool {
        matches!(self, RefField::RequestProject)
    }
}

/// Document-store operations the services rely on. Implementations must make
/// each single-document reference update atomic; nothing spans documents.
#[async_trait]
pub trait StaffingStore: Send + Sync {
    async fn insert_employees(&self, batch: Vec<CreateEmployee>) -> Result<Vec<Employee>, StoreError>;
    async fn find_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, StoreError>;
    /// Records for the given ids in the order of `ids`; unknown ids are skipped.
    async fn get_employees(&self, ids: &[Uuid]) -> Result<Vec<Employee>, StoreError>;
    async fn update_employee(
        &self,
        id: Uuid,
        patch: &EmployeePatch,
    ) -> Result<Option<Employee>, StoreError>;
    async fn delete_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError>;

    async fn insert_projects(&self, batch: Vec<CreateProject>) -> Result<Vec<Project>, StoreError>;
    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError>;
    async fn get_projects(&self, ids: &[Uuid]) -> Result<Vec<Project>, StoreError>;
    async fn update_project(
        &self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError>;
    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn insert_requests(
        &self,
        batch: Vec<CreateRequest>,
    ) -> Result<Vec<StaffingRequest>, StoreError>;
    async fn find_requests(&self, filter: &RequestFilter) -> Result<Vec<StaffingRequest>, StoreError>;
    async fn get_requests(&self, ids: &[Uuid]) -> Result<Vec<StaffingRequest>, StoreError>;
    async fn update_request(
        &self,
        id: Uuid,
        patch: &RequestPatch,
    ) -> Result<Option<StaffingRequest>, StoreError>;
    async fn delete_request(&self, id: Uuid) -> Result<Option<StaffingRequest>, StoreError>;

    async fn exists(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError>;

    /// Set-add `target` to `field` on `owner`. For single-valued fields the
    /// previous occupant is returned when it differed from `target`.
    async fn add_reference(
        &self,
        field: RefField,
        owner: Uuid,
        target: Uuid,
    ) -> Result<Option<Uuid>, StoreError>;

    /// Remove `target` from `field` on `owner`; absent links are a no-op.
    async fn pull_reference(&self, field: RefField, owner: Uuid, target: Uuid) -> Result<(), StoreError>;

    /// Remove `target` from `field` on every document; returns documents touched.
    async fn pull_reference_everywhere(&self, field: RefField, target: Uuid) -> Result<u64, StoreError>;

    async fn find_dictionary(&self, name: &str) -> Result<Option<Dictionary>, StoreError>;

    /// Insert unless a dictionary with that name exists. Returns whether it was inserted.
    async fn insert_dictionary_if_absent(&self, dictionary: &Dictionary) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self.get_employees(&[id]).await?.into_iter().next())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.get_projects(&[id]).await?.into_iter().next())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<StaffingRequest>, StoreError> {
        Ok(self.get_requests(&[id]).await?.into_iter().next())
    }
}

/// Reorder `items` to follow `ids`, dropping ids without a record.
pub(crate) fn order_by_ids<T, F>(mut items: Vec<T>, ids: &[Uuid], key: F) -> Vec<T>
where
    F: Fn(&T) -> Uuid,
{
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(pos) = items.iter().position(|item| key(item) == *id) {
            ordered.push(items.swap_remove(pos));
        }
    }
    ordered
}
