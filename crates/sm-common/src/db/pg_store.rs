use async_trait::async_trait;
use uuid::Uuid;

use super::store::{RefField, StaffingStore, StoreError};
use super::{PgPool, dictionaries, employees, projects, references, requests};
use crate::api::{
    CreateEmployee, CreateProject, CreateRequest, Dictionary, Employee, EmployeeFilter,
    EmployeePatch, EntityKind, Project, ProjectFilter, ProjectPatch, RequestFilter, RequestPatch,
    StaffingRequest,
};

/// Postgres-backed store. Reference fields are `UUID[]` columns (or a nullable
/// `UUID` for the request's project slot) updated with single statements.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StaffingStore for PgStore {
    async fn insert_employees(&self, batch: Vec<CreateEmployee>) -> Result<Vec<Employee>, StoreError> {
        employees::insert_employees(&self.pool, batch).await
    }

    async fn find_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, StoreError> {
        employees::find_employees(&self.pool, filter).await
    }

    async fn get_employees(&self, ids: &[Uuid]) -> Result<Vec<Employee>, StoreError> {
        employees::get_employees(&self.pool, ids).await
    }

    async fn update_employee(
        &self,
        id: Uuid,
        patch: &EmployeePatch,
    ) -> Result<Option<Employee>, StoreError> {
        employees::update_employee(&self.pool, id, patch).await
    }

    async fn delete_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        employees::delete_employee(&self.pool, id).await
    }

    async fn insert_projects(&self, batch: Vec<CreateProject>) -> Result<Vec<Project>, StoreError> {
        projects::insert_projects(&self.pool, batch).await
    }

    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        projects::find_projects(&self.pool, filter).await
    }

    async fn get_projects(&self, ids: &[Uuid]) -> Result<Vec<Project>, StoreError> {
        projects::get_projects(&self.pool, ids).await
    }

    async fn update_project(
        &self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        projects::update_project(&self.pool, id, patch).await
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        projects::delete_project(&self.pool, id).await
    }

    async fn insert_requests(
        &self,
        batch: Vec<CreateRequest>,
    ) -> Result<Vec<StaffingRequest>, StoreError> {
        requests::insert_requests(&self.pool, batch).await
    }

    async fn find_requests(&self, filter: &RequestFilter) -> Result<Vec<StaffingRequest>, StoreError> {
        requests::find_requests(&self.pool, filter).await
    }

    async fn get_requests(&self, ids: &[Uuid]) -> Result<Vec<StaffingRequest>, StoreError> {
        requests::get_requests(&self.pool, ids).await
    }

    async fn update_request(
        &self,
        id: Uuid,
        patch: &RequestPatch,
    ) -> Result<Option<StaffingRequest>, StoreError> {
        requests::update_request(&self.pool, id, patch).await
    }

    async fn delete_request(&self, id: Uuid) -> Result<Option<StaffingRequest>, StoreError> {
        requests::delete_request(&self.pool, id).await
    }

    async fn exists(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
        references::exists(&self.pool, kind, id).await
    }

    async fn add_reference(
        &self,
        field: RefField,
        owner: Uuid,
        target: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        references::add_reference(&self.pool, field, owner, target).await
    }

    async fn pull_reference(&self, field: RefField, owner: Uuid, target: Uuid) -> Result<(), StoreError> {
        references::pull_reference(&self.pool, field, owner, target).await
    }

    async fn pull_reference_everywhere(&self, field: RefField, target: Uuid) -> Result<u64, StoreError> {
        references::pull_reference_everywhere(&self.pool, field, target).await
    }

    async fn find_dictionary(&self, name: &str) -> Result<Option<Dictionary>, StoreError> {
        dictionaries::find_dictionary(&self.pool, name).await
    }

    async fn insert_dictionary_if_absent(&self, dictionary: &Dictionary) -> Result<bool, StoreError> {
        dictionaries::insert_dictionary_if_absent(&self.pool, dictionary).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        references::ping(&self.pool).await
    }
}
