use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    RelationCoordinator, ServiceError, first_created, index_by_id, not_found, pick, unique_ids,
};
use crate::api::{
    CreateEmployee, Employee, EmployeeFilter, EmployeePatch, EmployeeView, EntityKind,
    PopulatedEmployee,
};
use crate::db::{RefField, StaffingStore};
use crate::validation::Validate;

#[derive(Clone, Copy)]
pub struct EmployeeService<'a> {
    store: &'a dyn StaffingStore,
    relations: RelationCoordinator<'a>,
}

impl<'a> EmployeeService<'a> {
    pub fn new(store: &'a dyn StaffingStore, relations: RelationCoordinator<'a>) -> Self {
        Self { store, relations }
    }

    pub async fn create(&self, input: CreateEmployee) -> Result<Employee, ServiceError> {
        first_created(self.create_many(vec![input]).await?)
    }

    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub async fn create_many(&self, mut batch: Vec<CreateEmployee>) -> Result<Vec<Employee>, ServiceError> {
        for input in batch.iter_mut() {
            input.normalize();
            input.validate()?;
        }
        let created = self.store.insert_employees(batch).await?;
        info!(count = created.len(), "employees created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, filter: &EmployeeFilter) -> Result<Vec<EmployeeView>, ServiceError> {
        let employees = self.store.find_employees(filter).await?;
        if filter.populate {
            Ok(self
                .populate(employees)
                .await?
                .into_iter()
                .map(EmployeeView::Populated)
                .collect())
        } else {
            Ok(employees.into_iter().map(EmployeeView::Plain).collect())
        }
    }

    pub async fn find_by_id(&self, id: Uuid, populate: bool) -> Result<EmployeeView, ServiceError> {
        let employee = self
            .store
            .get_employee(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Employee, id))?;

        if populate {
            let mut populated = self.populate(vec![employee]).await?;
            populated
                .pop()
                .map(EmployeeView::Populated)
                .ok_or_else(|| not_found(EntityKind::Employee, id))
        } else {
            Ok(EmployeeView::Plain(employee))
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, mut patch: EmployeePatch) -> Result<Employee, ServiceError> {
        patch.normalize();
        patch.validate()?;
        self.store
            .update_employee(id, &patch)
            .await?
            .ok_or_else(|| not_found(EntityKind::Employee, id))
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<Employee, ServiceError> {
        let removed = self
            .store
            .delete_employee(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Employee, id))?;
        self.relations.on_entity_deleted(EntityKind::Employee, id).await?;
        info!(%id, "employee removed");
        Ok(removed)
    }

    pub async fn assign_project(&self, id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.relations.assign(RefField::EmployeeProjects, id, project_id).await
    }

    pub async fn remove_project(&self, id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.relations.unassign(RefField::EmployeeProjects, id, project_id).await
    }

    pub async fn assign_request(&self, id: Uuid, request_id: Uuid) -> Result<(), ServiceError> {
        self.relations.assign(RefField::EmployeeRequests, id, request_id).await
    }

    pub async fn remove_request(&self, id: Uuid, request_id: Uuid) -> Result<(), ServiceError> {
        self.relations.unassign(RefField::EmployeeRequests, id, request_id).await
    }

    async fn populate(&self, employees: Vec<Employee>) -> Result<Vec<PopulatedEmployee>, ServiceError> {
        let project_ids = unique_ids(employees.iter().map(|e| e.projects.as_slice()));
        let request_ids = unique_ids(employees.iter().map(|e| e.requests.as_slice()));

        let projects = index_by_id(self.store.get_projects(&project_ids).await?, |p| p.id);
        let requests = index_by_id(self.store.get_requests(&request_ids).await?, |r| r.id);

        Ok(employees
            .into_iter()
            .map(|employee| {
                let linked_projects = pick(&projects, &employee.projects);
                let linked_requests = pick(&requests, &employee.requests);
                employee.populated(linked_projects, linked_requests)
            })
            .collect())
    }
}
