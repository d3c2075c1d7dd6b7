use tracing::{debug, instrument};
use uuid::Uuid;

use super::{ServiceError, not_found};
use crate::api::EntityKind;
use crate::db::{RefField, StaffingStore};

/// Keeps both sides of every link in sync. Each step is a single-document
/// update; a failure between the two sides leaves them asymmetric until the
/// caller retries.
#[derive(Clone, Copy)]
pub struct RelationCoordinator<'a> {
    store: &'a dyn StaffingStore,
}

impl<'a> RelationCoordinator<'a> {
    pub fn new(store: &'a dyn StaffingStore) -> Self {
        Self { store }
    }

    async fn ensure_exists(&self, kind: EntityKind, id: Uuid) -> Result<(), ServiceError> {
        if self.store.exists(kind, id).await? {
            Ok(())
        } else {
            Err(not_found(kind, id))
        }
    }

    /// Link `owner` (which holds `field`) and `target`. The owner is checked
    /// and written first.
    #[instrument(skip(self))]
    pub async fn assign(&self, field: RefField, owner: Uuid, target: Uuid) -> Result<(), ServiceError> {
        self.ensure_exists(field.owner(), owner).await?;
        self.ensure_exists(field.target(), target).await?;

        let inverse = field.inverse();
        let displaced = self.store.add_reference(field, owner, target).await?;
        let displaced_inverse = self.store.add_reference(inverse, target, owner).await?;

        // A request has one project; the project it left must forget it.
        if let Some(previous) = displaced {
            debug!(%previous, "owner moved off previous target");
            self.store.pull_reference(inverse, previous, owner).await?;
        }
        if let Some(previous) = displaced_inverse {
            debug!(%previous, "target moved off previous owner");
            self.store.pull_reference(field, previous, target).await?;
        }
        Ok(())
    }

    /// Strip the link from both sides. Missing documents and links are ignored.
    #[instrument(skip(self))]
    pub async fn unassign(&self, field: RefField, owner: Uuid, target: Uuid) -> Result<(), ServiceError> {
        self.store.pull_reference(field, owner, target).await?;
        self.store.pull_reference(field.inverse(), target, owner).await?;
        Ok(())
    }

    /// Add `owner` to the inverse field of every target. Used when an owner is
    /// created with its own side of the links already filled in.
    #[instrument(skip(self, targets), fields(count = targets.len()))]
    pub async fn backfill(&self, field: RefField, owner: Uuid, targets: &[Uuid]) -> Result<(), ServiceError> {
        for target in targets {
            self.store.add_reference(field.inverse(), *target, owner).await?;
        }
        Ok(())
    }

    /// Pull a deleted document's id from every field that can point at it.
    #[instrument(skip(self))]
    pub async fn on_entity_deleted(&self, kind: EntityKind, id: Uuid) -> Result<(), ServiceError> {
        for field in RefField::ALL.into_iter().filter(|f| f.target() == kind) {
            let touched = self.store.pull_reference_everywhere(field, id).await?;
            debug!(?field, touched, "removed dangling references");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CreateEmployee, CreateProject, CreateRequest, EmployeeGrade};
    use crate::db::MemoryStore;
    use chrono::Utc;

    async fn seeded() -> (MemoryStore, Uuid, Uuid, Uuid) {
        let store = MemoryStore::new();
        let employee = store
            .insert_employees(vec![CreateEmployee::new("Ivan", "QA", EmployeeGrade::Middle)])
            .await
            .unwrap()[0]
            .id;
        let project = store
            .insert_projects(vec![CreateProject::new("Atlas", "Fintech", Utc::now())])
            .await
            .unwrap()[0]
            .id;
        let request = store
            .insert_requests(vec![CreateRequest::new("Senior QA", "Senior", "Remote")])
            .await
            .unwrap()[0]
            .id;
        (store, employee, project, request)
    }

    #[tokio::test]
    async fn assign_reports_missing_owner_before_target() {
        let (store, employee, _, _) = seeded().await;
        let relations = RelationCoordinator::new(&store);
        let ghost_owner = Uuid::new_v4();
        let ghost_target = Uuid::new_v4();

        let err = relations
            .assign(RefField::ProjectTeam, ghost_owner, ghost_target)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Project with ID \"{ghost_owner}\" not found"));

        let err = relations
            .assign(RefField::EmployeeProjects, employee, ghost_target)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Project with ID \"{ghost_target}\" not found"));
    }

    #[tokio::test]
    async fn moving_a_request_updates_the_previous_project() {
        let (store, _, first, request) = seeded().await;
        let second = store
            .insert_projects(vec![CreateProject::new("Borealis", "Retail", Utc::now())])
            .await
            .unwrap()[0]
            .id;
        let relations = RelationCoordinator::new(&store);

        relations.assign(RefField::RequestProject, request, first).await.unwrap();
        relations.assign(RefField::ProjectRequests, second, request).await.unwrap();

        let request = store.get_request(request).await.unwrap().unwrap();
        assert_eq!(request.project, Some(second));
        assert!(store.get_project(first).await.unwrap().unwrap().requests.is_empty());
        assert_eq!(
            store.get_project(second).await.unwrap().unwrap().requests,
            vec![request.id]
        );
    }

    #[tokio::test]
    async fn deleting_an_employee_clears_every_back_reference() {
        let (store, employee, project, request) = seeded().await;
        let relations = RelationCoordinator::new(&store);
        relations.assign(RefField::EmployeeProjects, employee, project).await.unwrap();
        relations.assign(RefField::EmployeeRequests, employee, request).await.unwrap();

        store.delete_employee(employee).await.unwrap();
        relations.on_entity_deleted(EntityKind::Employee, employee).await.unwrap();

        assert!(store.get_project(project).await.unwrap().unwrap().team.is_empty());
        assert!(
            store
                .get_request(request)
                .await
                .unwrap()
                .unwrap()
                .assigned_employees
                .is_empty()
        );
    }
}
