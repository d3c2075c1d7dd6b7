use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    RelationCoordinator, ServiceError, first_created, index_by_id, not_found, pick, unique_ids,
};
use crate::api::project::ensure_ordered;
use crate::api::{
    CreateProject, EntityKind, PopulatedProject, Project, ProjectFilter, ProjectPatch, ProjectView,
};
use crate::db::{RefField, StaffingStore};
use crate::validation::Validate;

#[derive(Clone, Copy)]
pub struct ProjectService<'a> {
    store: &'a dyn StaffingStore,
    relations: RelationCoordinator<'a>,
}

impl<'a> ProjectService<'a> {
    pub fn new(store: &'a dyn StaffingStore, relations: RelationCoordinator<'a>) -> Self {
        Self { store, relations }
    }

    pub async fn create(&self, input: CreateProject) -> Result<Project, ServiceError> {
        first_created(self.create_many(vec![input]).await?)
    }

    /// Initial team members must exist; each one gets the new project linked back.
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub async fn create_many(&self, mut batch: Vec<CreateProject>) -> Result<Vec<Project>, ServiceError> {
        for input in batch.iter_mut() {
            input.normalize();
            input.validate()?;
        }

        let members = unique_ids(batch.iter().map(|p| p.team.as_slice()));
        for member in &members {
            if !self.store.exists(EntityKind::Employee, *member).await? {
                return Err(not_found(EntityKind::Employee, *member));
            }
        }

        let created = self.store.insert_projects(batch).await?;
        for project in &created {
            self.relations
                .backfill(RefField::ProjectTeam, project.id, &project.team)
                .await?;
        }
        info!(count = created.len(), "projects created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, filter: &ProjectFilter) -> Result<Vec<ProjectView>, ServiceError> {
        let projects = self.store.find_projects(filter).await?;
        if filter.populate {
            Ok(self
                .populate(projects)
                .await?
                .into_iter()
                .map(ProjectView::Populated)
                .collect())
        } else {
            Ok(projects.into_iter().map(ProjectView::Plain).collect())
        }
    }

    pub async fn find_by_id(&self, id: Uuid, populate: bool) -> Result<ProjectView, ServiceError> {
        let project = self
            .store
            .get_project(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Project, id))?;

        if populate {
            let mut populated = self.populate(vec![project]).await?;
            populated
                .pop()
                .map(ProjectView::Populated)
                .ok_or_else(|| not_found(EntityKind::Project, id))
        } else {
            Ok(ProjectView::Plain(project))
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, mut patch: ProjectPatch) -> Result<Project, ServiceError> {
        patch.normalize();
        patch.validate()?;

        // Dates are validated against the stored counterpart when only one side changes.
        if patch.start_date.is_some() != patch.end_date.is_some() {
            let current = self
                .store
                .get_project(id)
                .await?
                .ok_or_else(|| not_found(EntityKind::Project, id))?;
            let start = patch.start_date.unwrap_or(current.start_date);
            if let Some(end) = patch.end_date.or(current.end_date) {
                ensure_ordered(start, end)?;
            }
        }

        self.store
            .update_project(id, &patch)
            .await?
            .ok_or_else(|| not_found(EntityKind::Project, id))
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<Project, ServiceError> {
        let removed = self
            .store
            .delete_project(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Project, id))?;
        self.relations.on_entity_deleted(EntityKind::Project, id).await?;
        info!(%id, "project removed");
        Ok(removed)
    }

    pub async fn assign_employee(&self, id: Uuid, employee_id: Uuid) -> Result<(), ServiceError> {
        self.relations.assign(RefField::ProjectTeam, id, employee_id).await
    }

    pub async fn remove_employee(&self, id: Uuid, employee_id: Uuid) -> Result<(), ServiceError> {
        self.relations.unassign(RefField::ProjectTeam, id, employee_id).await
    }

    pub async fn assign_request(&self, id: Uuid, request_id: Uuid) -> Result<(), ServiceError> {
        self.relations.assign(RefField::ProjectRequests, id, request_id).await
    }

    pub async fn remove_request(&self, id: Uuid, request_id: Uuid) -> Result<(), ServiceError> {
        self.relations.unassign(RefField::ProjectRequests, id, request_id).await
    }

    async fn populate(&self, projects: Vec<Project>) -> Result<Vec<PopulatedProject>, ServiceError> {
        let member_ids = unique_ids(projects.iter().map(|p| p.team.as_slice()));
        let request_ids = unique_ids(projects.iter().map(|p| p.requests.as_slice()));

        let members = index_by_id(self.store.get_employees(&member_ids).await?, |e| e.id);
        let requests = index_by_id(self.store.get_requests(&request_ids).await?, |r| r.id);

        Ok(projects
            .into_iter()
            .map(|project| {
                let team = pick(&members, &project.team);
                let linked_requests = pick(&requests, &project.requests);
                project.populated(team, linked_requests)
            })
            .collect())
    }
}
