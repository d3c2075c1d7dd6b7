use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    DictionaryService, RelationCoordinator, ServiceError, StaffingOptions, first_created,
    index_by_id, not_found, pick, unique_ids,
};
use crate::api::{
    CreateRequest, EntityKind, PopulatedRequest, RequestFilter, RequestPatch, RequestView,
    StaffingRequest,
};
use crate::db::{RefField, StaffingStore};
use crate::validation::{Validate, check_in_dictionary};

/// Controlled-vocabulary fields checked on create and update.
struct VocabularyFields<'v> {
    skills: Option<&'v [String]>,
    technologies: Option<&'v [String]>,
    location: Option<&'v str>,
}

#[derive(Clone, Copy)]
pub struct RequestService<'a> {
    store: &'a dyn StaffingStore,
    relations: RelationCoordinator<'a>,
    dictionaries: DictionaryService<'a>,
    options: StaffingOptions,
}

impl<'a> RequestService<'a> {
    pub fn new(
        store: &'a dyn StaffingStore,
        relations: RelationCoordinator<'a>,
        dictionaries: DictionaryService<'a>,
        options: StaffingOptions,
    ) -> Self {
        Self {
            store,
            relations,
            dictionaries,
            options,
        }
    }

    async fn check_vocabulary(&self, fields: VocabularyFields<'_>) -> Result<(), ServiceError> {
        if !self.options.dictionary_validation {
            return Ok(());
        }

        if let Some(skills) = fields.skills {
            check_in_dictionary(&self.dictionaries, "skills", skills)
                .await?
                .into_result("skills", "skills")?;
        }
        if let Some(technologies) = fields.technologies {
            check_in_dictionary(&self.dictionaries, "technologies", technologies)
                .await?
                .into_result("technologies", "technologies")?;
        }
        if let Some(location) = fields.location {
            check_in_dictionary(&self.dictionaries, "locations", &[location.to_string()])
                .await?
                .into_result("location.name", "locations")?;
        }
        Ok(())
    }

    pub async fn create(&self, input: CreateRequest) -> Result<StaffingRequest, ServiceError> {
        first_created(self.create_many(vec![input]).await?)
    }

    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub async fn create_many(
        &self,
        mut batch: Vec<CreateRequest>,
    ) -> Result<Vec<StaffingRequest>, ServiceError> {
        for input in batch.iter_mut() {
            input.normalize();
            input.validate()?;
            self.check_vocabulary(VocabularyFields {
                skills: Some(input.skills.as_slice()),
                technologies: Some(input.technologies.as_slice()),
                location: Some(input.location.name.as_str()),
            })
            .await?;
        }
        let created = self.store.insert_requests(batch).await?;
        info!(count = created.len(), "requests created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, filter: &RequestFilter) -> Result<Vec<RequestView>, ServiceError> {
        let requests = self.store.find_requests(filter).await?;
        if filter.populate {
            Ok(self
                .populate(requests)
                .await?
                .into_iter()
                .map(RequestView::Populated)
                .collect())
        } else {
            Ok(requests.into_iter().map(RequestView::Plain).collect())
        }
    }

    pub async fn find_by_id(&self, id: Uuid, populate: bool) -> Result<RequestView, ServiceError> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Request, id))?;

        if populate {
            let mut populated = self.populate(vec![request]).await?;
            populated
                .pop()
                .map(RequestView::Populated)
                .ok_or_else(|| not_found(EntityKind::Request, id))
        } else {
            Ok(RequestView::Plain(request))
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, mut patch: RequestPatch) -> Result<StaffingRequest, ServiceError> {
        patch.normalize();
        patch.validate()?;
        self.check_vocabulary(VocabularyFields {
            skills: patch.skills.as_deref(),
            technologies: patch.technologies.as_deref(),
            location: patch.location.as_ref().map(|l| l.name.as_str()),
        })
        .await?;

        self.store
            .update_request(id, &patch)
            .await?
            .ok_or_else(|| not_found(EntityKind::Request, id))
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<StaffingRequest, ServiceError> {
        let removed = self
            .store
            .delete_request(id)
            .await?
            .ok_or_else(|| not_found(EntityKind::Request, id))?;
        self.relations.on_entity_deleted(EntityKind::Request, id).await?;
        info!(%id, "request removed");
        Ok(removed)
    }

    pub async fn assign_employee(&self, id: Uuid, employee_id: Uuid) -> Result<(), ServiceError> {
        self.relations
            .assign(RefField::RequestAssignedEmployees, id, employee_id)
            .await
    }

    pub async fn remove_employee(&self, id: Uuid, employee_id: Uuid) -> Result<(), ServiceError> {
        self.relations
            .unassign(RefField::RequestAssignedEmployees, id, employee_id)
            .await
    }

    pub async fn assign_project(&self, id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.relations.assign(RefField::RequestProject, id, project_id).await
    }

    pub async fn remove_project(&self, id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.relations.unassign(RefField::RequestProject, id, project_id).await
    }

    async fn populate(&self, requests: Vec<StaffingRequest>) -> Result<Vec<PopulatedRequest>, ServiceError> {
        let employee_ids = unique_ids(requests.iter().map(|r| r.assigned_employees.as_slice()));
        let project_ids = unique_ids(requests.iter().map(|r| r.project.as_slice()));

        let employees = index_by_id(self.store.get_employees(&employee_ids).await?, |e| e.id);
        let projects = index_by_id(self.store.get_projects(&project_ids).await?, |p| p.id);

        Ok(requests
            .into_iter()
            .map(|request| {
                let assigned = pick(&employees, &request.assigned_employees);
                let project = request.project.and_then(|id| projects.get(&id).cloned());
                request.populated(assigned, project)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DictionaryValues;
    use crate::db::MemoryStore;
    use crate::service::Staffing;
    use std::sync::Arc;

    async fn staffing_with_dictionaries() -> Staffing {
        let staffing = Staffing::new(Arc::new(MemoryStore::new()), StaffingOptions::default());
        let dictionaries = staffing.dictionaries();
        dictionaries
            .seed("skills", DictionaryValues::Flat(vec!["Jest".into(), "Postman".into()]))
            .await
            .unwrap();
        dictionaries
            .seed("technologies", DictionaryValues::Flat(vec!["React".into()]))
            .await
            .unwrap();
        dictionaries
            .seed("locations", DictionaryValues::Flat(vec!["Remote".into()]))
            .await
            .unwrap();
        staffing
    }

    #[tokio::test]
    async fn unknown_skill_is_a_validation_error() {
        let staffing = staffing_with_dictionaries().await;
        let mut input = CreateRequest::new("Automation QA", "Middle", "Remote");
        input.skills = vec!["Jest".into(), "Cobol".into()];

        let err = staffing.requests().create(input).await.unwrap_err();
        match err {
            ServiceError::Validation(err) => {
                assert_eq!(err.field, "skills");
                assert!(err.message.contains("Cobol"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unseeded_dictionary_fails_closed() {
        let staffing = Staffing::new(Arc::new(MemoryStore::new()), StaffingOptions::default());
        let err = staffing
            .requests()
            .create(CreateRequest::new("Manual QA", "Junior", "Remote"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "location.name"));
    }

    #[tokio::test]
    async fn validation_can_be_switched_off() {
        let staffing = Staffing::new(
            Arc::new(MemoryStore::new()),
            StaffingOptions {
                dictionary_validation: false,
            },
        );
        let created = staffing
            .requests()
            .create(CreateRequest::new("Manual QA", "Junior", "Anywhere"))
            .await
            .unwrap();
        assert_eq!(created.location.name, "Anywhere");
    }

    #[tokio::test]
    async fn patch_only_checks_supplied_vocabulary() {
        let staffing = staffing_with_dictionaries().await;
        let created = staffing
            .requests()
            .create(CreateRequest::new("Load QA", "Senior", "Remote"))
            .await
            .unwrap();

        let patch = RequestPatch {
            technologies: Some(vec!["Angular".into()]),
            ..RequestPatch::default()
        };
        let err = staffing.requests().update(created.id, patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "technologies"));

        let patch = RequestPatch {
            name: Some("Load QA (renamed)".into()),
            ..RequestPatch::default()
        };
        let updated = staffing.requests().update(created.id, patch).await.unwrap();
        assert_eq!(updated.name, "Load QA (renamed)");
    }
}
