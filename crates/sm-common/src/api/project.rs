use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use super::employee::Employee;
use super::filter::{contains_ignore_case, delimited, matches_exact, overlaps, within};
use super::request::StaffingRequest;
use crate::validation::{
    Validate, ValidationError, min_len, normalize_optional_set, normalize_set, not_empty,
    trim_in_place, trim_optional,
};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumString,
)]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    Paused,
    Finished,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, AsRefStr, EnumString,
)]
pub enum ProjectDirection {
    #[serde(rename = "QA")]
    #[strum(serialize = "QA")]
    Qa,
    #[serde(rename = "AQA")]
    #[strum(serialize = "AQA")]
    Aqa,
    #[serde(rename = "Performance Testing")]
    #[strum(serialize = "Performance Testing")]
    Performance,
    #[serde(rename = "Penetration Testing")]
    #[strum(serialize = "Penetration Testing")]
    Penetration,
    #[serde(rename = "Security Testing")]
    #[strum(serialize = "Security Testing")]
    Security,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project<E = Uuid, R = Uuid> {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub domain: String,
    pub directions: Vec<ProjectDirection>,
    pub technologies: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub team: Vec<E>,
    pub project_coordinator: String,
    pub intermediary: Option<String>,
    pub location: Option<String>,
    pub language: String,
    pub request_description: Vec<String>,
    pub requests: Vec<R>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type PopulatedProject = Project<Employee, StaffingRequest>;

impl Project {
    pub fn from_create(input: CreateProject, now: DateTime<Utc>) -> Self {
        let mut team: Vec<Uuid> = Vec::with_capacity(input.team.len());
        for member in input.team {
            if !team.contains(&member) {
                team.push(member);
            }
        }

        Self {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: input.name,
            status: input.status,
            domain: input.domain,
            directions: input.directions,
            technologies: input.technologies,
            start_date: input.start_date,
            end_date: input.end_date,
            team,
            project_coordinator: input.project_coordinator,
            intermediary: input.intermediary,
            location: input.location,
            language: input.language,
            request_description: input.request_description,
            requests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &ProjectPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(domain) = &patch.domain {
            self.domain = domain.clone();
        }
        if let Some(directions) = &patch.directions {
            self.directions = directions.clone();
        }
        if let Some(technologies) = &patch.technologies {
            self.technologies = technologies.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(coordinator) = &patch.project_coordinator {
            self.project_coordinator = coordinator.clone();
        }
        if let Some(intermediary) = &patch.intermediary {
            self.intermediary = Some(intermediary.clone());
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(description) = &patch.request_description {
            self.request_description = description.clone();
        }
        self.updated_at = now;
    }

    pub fn populated(self, team: Vec<Employee>, requests: Vec<StaffingRequest>) -> PopulatedProject {
        Project {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            status: self.status,
            domain: self.domain,
            directions: self.directions,
            technologies: self.technologies,
            start_date: self.start_date,
            end_date: self.end_date,
            team,
            project_coordinator: self.project_coordinator,
            intermediary: self.intermediary,
            location: self.location,
            language: self.language,
            request_description: self.request_description,
            requests,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub status: ProjectStatus,
    pub domain: String,
    #[serde(default)]
    pub directions: Vec<ProjectDirection>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Initial team; every employee gets this project linked back.
    #[serde(default)]
    pub team: Vec<Uuid>,
    pub project_coordinator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub language: String,
    #[serde(default)]
    pub request_description: Vec<String>,
}

impl CreateProject {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status: ProjectStatus::default(),
            domain: domain.into(),
            directions: vec![ProjectDirection::Qa],
            technologies: Vec::new(),
            start_date,
            end_date: None,
            team: Vec::new(),
            project_coordinator: "Coordinator".into(),
            intermediary: None,
            location: None,
            language: "English".into(),
            request_description: Vec::new(),
        }
    }
}

pub fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::new(
            "endDate",
            "must not be earlier than startDate",
        ));
    }
    Ok(())
}

impl Validate for CreateProject {
    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.domain);
        trim_in_place(&mut self.project_coordinator);
        trim_in_place(&mut self.language);
        trim_optional(&mut self.intermediary);
        trim_optional(&mut self.location);
        normalize_set(&mut self.technologies);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        min_len("name", &self.name, 2)?;
        not_empty("domain", &self.domain)?;
        if let Some(end_date) = self.end_date {
            ensure_ordered(self.start_date, end_date)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<ProjectDirection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_coordinator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_description: Option<Vec<String>>,
}

impl Validate for ProjectPatch {
    fn normalize(&mut self) {
        trim_optional(&mut self.name);
        trim_optional(&mut self.domain);
        trim_optional(&mut self.project_coordinator);
        trim_optional(&mut self.language);
        trim_optional(&mut self.intermediary);
        trim_optional(&mut self.location);
        normalize_optional_set(&mut self.technologies);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            min_len("name", name, 2)?;
        }
        if let Some(domain) = &self.domain {
            not_empty("domain", domain)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            ensure_ordered(start, end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "delimited")]
    pub directions: Option<Vec<ProjectDirection>>,
    #[serde(default, deserialize_with = "delimited")]
    pub technologies: Option<Vec<String>>,
    pub team_member_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub populate: bool,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.name
            .as_deref()
            .is_none_or(|name| contains_ignore_case(&project.name, name))
            && matches_exact(&project.status, self.status.as_ref())
            && matches_exact(&project.domain, self.domain.as_ref())
            && overlaps(&project.directions, self.directions.as_deref())
            && overlaps(&project.technologies, self.technologies.as_deref())
            && self
                .team_member_id
                .is_none_or(|member| project.team.contains(&member))
            && within(project.created_at, self.created_after, self.created_before)
    }
}
