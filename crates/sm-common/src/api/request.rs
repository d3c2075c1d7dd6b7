use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use super::employee::Employee;
use super::filter::{contains_ignore_case, delimited, matches_exact, overlaps, within};
use super::project::Project;
use crate::validation::{
    Validate, ValidationError, at_least, normalize_optional_set, normalize_set, not_empty,
    trim_in_place,
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
pub enum RequestStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[serde(rename = "On Hold")]
    #[strum(serialize = "On Hold")]
    OnHold,
    Closed,
}

/// Project state as tracked on the request itself.
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
pub enum RequestProjectStatus {
    #[default]
    #[serde(rename = "Not Started")]
    #[strum(serialize = "Not Started")]
    NotStarted,
    Active,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffingInfo {
    pub count: u32,
    pub grade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub name: String,
    pub is_remote_allowed: bool,
    pub is_critical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageInfo {
    pub language: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Languages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<LanguageInfo>,
    #[serde(default)]
    pub secondary: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Management {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_manager: Option<String>,
}

/// An open staffing position. `E` is the element type of `assignedEmployees`,
/// `P` the type of the optional project link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffingRequest<E = Uuid, P = Uuid> {
    pub id: Uuid,
    pub request_id: Uuid,
    pub name: String,
    pub meta: Map<String, Value>,
    pub staffing: StaffingInfo,
    pub location: LocationInfo,
    pub languages: Languages,
    pub management: Management,
    pub technologies: Vec<String>,
    pub skills: Vec<String>,
    pub status: RequestStatus,
    pub project_status: RequestProjectStatus,
    pub assigned_employees: Vec<E>,
    pub project: Option<P>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type PopulatedRequest = StaffingRequest<Employee, Project>;

impl StaffingRequest {
    pub fn from_create(input: CreateRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            name: input.name,
            meta: input.meta,
            staffing: input.staffing,
            location: input.location,
            languages: input.languages,
            management: input.management,
            technologies: input.technologies,
            skills: input.skills,
            status: input.status,
            project_status: input.project_status,
            assigned_employees: Vec::new(),
            project: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &RequestPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(meta) = &patch.meta {
            self.meta = meta.clone();
        }
        if let Some(staffing) = &patch.staffing {
            self.staffing = staffing.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(languages) = &patch.languages {
            self.languages = languages.clone();
        }
        if let Some(management) = &patch.management {
            self.management = management.clone();
        }
        if let Some(technologies) = &patch.technologies {
            self.technologies = technologies.clone();
        }
        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(project_status) = patch.project_status {
            self.project_status = project_status;
        }
        self.updated_at = now;
    }

    pub fn populated(self, assigned_employees: Vec<Employee>, project: Option<Project>) -> PopulatedRequest {
        StaffingRequest {
            id: self.id,
            request_id: self.request_id,
            name: self.name,
            meta: self.meta,
            staffing: self.staffing,
            location: self.location,
            languages: self.languages,
            management: self.management,
            technologies: self.technologies,
            skills: self.skills,
            status: self.status,
            project_status: self.project_status,
            assigned_employees,
            project,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRequest {
    pub name: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub staffing: StaffingInfo,
    pub location: LocationInfo,
    #[serde(default)]
    pub languages: Languages,
    #[serde(default)]
    pub management: Management,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub project_status: RequestProjectStatus,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, grade: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: Map::new(),
            staffing: StaffingInfo {
                count: 1,
                grade: grade.into(),
            },
            location: LocationInfo {
                name: location.into(),
                is_remote_allowed: true,
                is_critical: false,
            },
            languages: Languages::default(),
            management: Management::default(),
            technologies: Vec::new(),
            skills: Vec::new(),
            status: RequestStatus::default(),
            project_status: RequestProjectStatus::default(),
        }
    }
}

fn validate_staffing(staffing: &StaffingInfo) -> Result<(), ValidationError> {
    at_least("staffing.count", staffing.count, 1)?;
    not_empty("staffing.grade", &staffing.grade)
}

fn validate_languages(languages: &Languages) -> Result<(), ValidationError> {
    for info in languages.primary.iter().chain(languages.secondary.iter()) {
        not_empty("languages.language", &info.language)?;
        not_empty("languages.level", &info.level)?;
    }
    Ok(())
}

impl Validate for CreateRequest {
    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.staffing.grade);
        trim_in_place(&mut self.location.name);
        normalize_set(&mut self.skills);
        normalize_set(&mut self.technologies);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        not_empty("name", &self.name)?;
        validate_staffing(&self.staffing)?;
        not_empty("location.name", &self.location.name)?;
        validate_languages(&self.languages)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staffing: Option<StaffingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Languages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management: Option<Management>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_status: Option<RequestProjectStatus>,
}

impl Validate for RequestPatch {
    fn normalize(&mut self) {
        if let Some(name) = self.name.as_mut() {
            trim_in_place(name);
        }
        if let Some(staffing) = self.staffing.as_mut() {
            trim_in_place(&mut staffing.grade);
        }
        if let Some(location) = self.location.as_mut() {
            trim_in_place(&mut location.name);
        }
        normalize_optional_set(&mut self.skills);
        normalize_optional_set(&mut self.technologies);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            not_empty("name", name)?;
        }
        if let Some(staffing) = &self.staffing {
            validate_staffing(staffing)?;
        }
        if let Some(location) = &self.location {
            not_empty("location.name", &location.name)?;
        }
        if let Some(languages) = &self.languages {
            validate_languages(languages)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub name: Option<String>,
    pub status: Option<RequestStatus>,
    pub project_status: Option<RequestProjectStatus>,
    /// Matches `staffing.grade`.
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "delimited")]
    pub skills: Option<Vec<String>>,
    #[serde(default, deserialize_with = "delimited")]
    pub technologies: Option<Vec<String>>,
    pub project_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub populate: bool,
}

impl RequestFilter {
    pub fn matches(&self, request: &StaffingRequest) -> bool {
        self.name
            .as_deref()
            .is_none_or(|name| contains_ignore_case(&request.name, name))
            && matches_exact(&request.status, self.status.as_ref())
            && matches_exact(&request.project_status, self.project_status.as_ref())
            && matches_exact(&request.staffing.grade, self.grade.as_ref())
            && overlaps(&request.skills, self.skills.as_deref())
            && overlaps(&request.technologies, self.technologies.as_deref())
            && self
                .project_id
                .is_none_or(|project| request.project == Some(project))
            && within(request.created_at, self.created_after, self.created_before)
    }
}
