//! In-process store used by tests and `--storage memory` runs.
//!
//! Every operation takes the collection lock once, so single-document updates
//! are atomic the same way a Postgres statement is.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{RefField, StaffingStore, StoreError, order_by_ids};
use crate::api::{
    CreateEmployee, CreateProject, CreateRequest, Dictionary, Employee, EmployeeFilter,
    EmployeePatch, EntityKind, Project, ProjectFilter, ProjectPatch, RequestFilter, RequestPatch,
    StaffingRequest,
};

#[derive(Debug, Default)]
struct Collections {
    employees: Vec<Employee>,
    projects: Vec<Project>,
    requests: Vec<StaffingRequest>,
    dictionaries: HashMap<String, Dictionary>,
}

enum Refs<'a> {
    Many(&'a mut Vec<Uuid>),
    One(&'a mut Option<Uuid>),
}

struct Slot<'a> {
    refs: Refs<'a>,
    updated_at: &'a mut DateTime<Utc>,
}

impl Slot<'_> {
    fn add(self, target: Uuid, now: DateTime<Utc>) -> Option<Uuid> {
        match self.refs {
            Refs::Many(list) => {
                if !list.contains(&target) {
                    list.push(target);
                    *self.updated_at = now;
                }
                None
            }
            Refs::One(slot) => {
                let previous = slot.replace(target);
                if previous != Some(target) {
                    *self.updated_at = now;
                }
                previous.filter(|prev| *prev != target)
            }
        }
    }

    fn pull(self, target: Uuid, now: DateTime<Utc>) -> bool {
        let changed = match self.refs {
            Refs::Many(list) => {
                let before = list.len();
                list.retain(|id| *id != target);
                list.len() != before
            }
            Refs::One(slot) => {
                if *slot == Some(target) {
                    *slot = None;
                    true
                } else {
                    false
                }
            }
        };
        if changed {
            *self.updated_at = now;
        }
        changed
    }
}

impl Collections {
    fn slots(&mut self, field: RefField) -> Vec<(Uuid, Slot<'_>)> {
        match field {
            RefField::EmployeeProjects => self
                .employees
                .iter_mut()
                .map(|e| (e.id, Slot { refs: Refs::Many(&mut e.projects), updated_at: &mut e.updated_at }))
                .collect(),
            RefField::EmployeeRequests => self
                .employees
                .iter_mut()
                .map(|e| (e.id, Slot { refs: Refs::Many(&mut e.requests), updated_at: &mut e.updated_at }))
                .collect(),
            RefField::ProjectTeam => self
                .projects
                .iter_mut()
                .map(|p| (p.id, Slot { refs: Refs::Many(&mut p.team), updated_at: &mut p.updated_at }))
                .collect(),
            RefField::ProjectRequests => self
                .projects
                .iter_mut()
                .map(|p| (p.id, Slot { refs: Refs::Many(&mut p.requests), updated_at: &mut p.updated_at }))
                .collect(),
            RefField::RequestAssignedEmployees => self
                .requests
                .iter_mut()
                .map(|r| {
                    (r.id, Slot { refs: Refs::Many(&mut r.assigned_employees), updated_at: &mut r.updated_at })
                })
                .collect(),
            RefField::RequestProject => self
                .requests
                .iter_mut()
                .map(|r| (r.id, Slot { refs: Refs::One(&mut r.project), updated_at: &mut r.updated_at }))
                .collect(),
        }
    }

    fn slot(&mut self, field: RefField, owner: Uuid) -> Option<Slot<'_>> {
        self.slots(field)
            .into_iter()
            .find(|(id, _)| *id == owner)
            .map(|(_, slot)| slot)
    }
}

fn ensure_unique_names<'a>(
    label: &str,
    existing: impl Iterator<Item = &'a str>,
    incoming: impl Iterator<Item = &'a str>,
) -> Result<(), StoreError> {
    let mut taken: Vec<&str> = existing.collect();
    for name in incoming {
        if taken.contains(&name) {
            return Err(StoreError::Conflict(format!(
                "{label} with name \"{name}\" already exists"
            )));
        }
        taken.push(name);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StaffingStore for MemoryStore {
    async fn insert_employees(&self, batch: Vec<CreateEmployee>) -> Result<Vec<Employee>, StoreError> {
        let mut inner = self.inner.write().await;
        ensure_unique_names(
            EntityKind::Employee.label(),
            inner.employees.iter().map(|e| e.name.as_str()),
            batch.iter().map(|e| e.name.as_str()),
        )?;

        let now = Utc::now();
        let created = batch
            .into_iter()
            .map(|input| Employee::from_create(input, now))
            .collect::<Vec<_>>();
        inner.employees.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .employees
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn get_employees(&self, ids: &[Uuid]) -> Result<Vec<Employee>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .employees
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect();
        Ok(order_by_ids(found, ids, |e| e.id))
    }

    async fn update_employee(
        &self,
        id: Uuid,
        patch: &EmployeePatch,
    ) -> Result<Option<Employee>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.employees.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name.as_deref() {
            ensure_unique_names(
                EntityKind::Employee.label(),
                inner.employees.iter().filter(|e| e.id != id).map(|e| e.name.as_str()),
                std::iter::once(name),
            )?;
        }

        let employee = &mut inner.employees[pos];
        employee.apply(patch, Utc::now());
        Ok(Some(employee.clone()))
    }

    async fn delete_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        let mut inner = self.inner.write().await;
        let position = inner.employees.iter().position(|e| e.id == id);
        Ok(position.map(|pos| inner.employees.remove(pos)))
    }

    async fn insert_projects(&self, batch: Vec<CreateProject>) -> Result<Vec<Project>, StoreError> {
        let mut inner = self.inner.write().await;
        ensure_unique_names(
            EntityKind::Project.label(),
            inner.projects.iter().map(|p| p.name.as_str()),
            batch.iter().map(|p| p.name.as_str()),
        )?;

        let now = Utc::now();
        let created = batch
            .into_iter()
            .map(|input| Project::from_create(input, now))
            .collect::<Vec<_>>();
        inner.projects.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .projects
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get_projects(&self, ids: &[Uuid]) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .projects
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        Ok(order_by_ids(found, ids, |p| p.id))
    }

    async fn update_project(
        &self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.projects.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name.as_deref() {
            ensure_unique_names(
                EntityKind::Project.label(),
                inner.projects.iter().filter(|p| p.id != id).map(|p| p.name.as_str()),
                std::iter::once(name),
            )?;
        }

        let project = &mut inner.projects[pos];
        project.apply(patch, Utc::now());
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let mut inner = self.inner.write().await;
        let position = inner.projects.iter().position(|p| p.id == id);
        Ok(position.map(|pos| inner.projects.remove(pos)))
    }

    async fn insert_requests(
        &self,
        batch: Vec<CreateRequest>,
    ) -> Result<Vec<StaffingRequest>, StoreError> {
        let mut inner = self.inner.write().await;
        ensure_unique_names(
            EntityKind::Request.label(),
            inner.requests.iter().map(|r| r.name.as_str()),
            batch.iter().map(|r| r.name.as_str()),
        )?;

        let now = Utc::now();
        let created = batch
            .into_iter()
            .map(|input| StaffingRequest::from_create(input, now))
            .collect::<Vec<_>>();
        inner.requests.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_requests(&self, filter: &RequestFilter) -> Result<Vec<StaffingRequest>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get_requests(&self, ids: &[Uuid]) -> Result<Vec<StaffingRequest>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .requests
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect();
        Ok(order_by_ids(found, ids, |r| r.id))
    }

    async fn update_request(
        &self,
        id: Uuid,
        patch: &RequestPatch,
    ) -> Result<Option<StaffingRequest>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.requests.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name.as_deref() {
            ensure_unique_names(
                EntityKind::Request.label(),
                inner.requests.iter().filter(|r| r.id != id).map(|r| r.name.as_str()),
                std::iter::once(name),
            )?;
        }

        let request = &mut inner.requests[pos];
        request.apply(patch, Utc::now());
        Ok(Some(request.clone()))
    }

    async fn delete_request(&self, id: Uuid) -> Result<Option<StaffingRequest>, StoreError> {
        let mut inner = self.inner.write().await;
        let position = inner.requests.iter().position(|r| r.id == id);
        Ok(position.map(|pos| inner.requests.remove(pos)))
    }

    async fn exists(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(match kind {
            EntityKind::Employee => inner.employees.iter().any(|e| e.id == id),
            EntityKind::Project => inner.projects.iter().any(|p| p.id == id),
            EntityKind::Request => inner.requests.iter().any(|r| r.id == id),
        })
    }

    async fn add_reference(
        &self,
        field: RefField,
        owner: Uuid,
        target: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .slot(field, owner)
            .and_then(|slot| slot.add(target, Utc::now())))
    }

    async fn pull_reference(&self, field: RefField, owner: Uuid, target: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.slot(field, owner) {
            slot.pull(target, Utc::now());
        }
        Ok(())
    }

    async fn pull_reference_everywhere(&self, field: RefField, target: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let touched = inner
            .slots(field)
            .into_iter()
            .filter(|(_, slot)| match &slot.refs {
                Refs::Many(list) => list.contains(&target),
                Refs::One(current) => **current == Some(target),
            })
            .map(|(_, slot)| slot.pull(target, now))
            .filter(|changed| *changed)
            .count();
        Ok(touched as u64)
    }

    async fn find_dictionary(&self, name: &str) -> Result<Option<Dictionary>, StoreError> {
        Ok(self.inner.read().await.dictionaries.get(name).cloned())
    }

    async fn insert_dictionary_if_absent(&self, dictionary: &Dictionary) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.dictionaries.contains_key(&dictionary.name) {
            return Ok(false);
        }
        inner
            .dictionaries
            .insert(dictionary.name.clone(), dictionary.clone());
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
