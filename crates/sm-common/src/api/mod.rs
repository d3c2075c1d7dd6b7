pub mod dictionary;
pub mod employee;
pub mod filter;
pub mod project;
pub mod request;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dictionary::{Dictionary, DictionaryEntry, DictionaryValues};
pub use employee::{
    CreateEmployee, Employee, EmployeeFilter, EmployeeGrade, EmployeePatch, EmployeeStatus,
    PopulatedEmployee, Workload,
};
pub use project::{
    CreateProject, PopulatedProject, Project, ProjectDirection, ProjectFilter, ProjectPatch,
    ProjectStatus,
};
pub use request::{
    CreateRequest, LanguageInfo, Languages, LocationInfo, Management, PopulatedRequest,
    RequestFilter, RequestPatch, RequestProjectStatus, RequestStatus, StaffingInfo,
    StaffingRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Employee,
    Project,
    Request,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Employee => "Employee",
            EntityKind::Project => "Project",
            EntityKind::Request => "Request",
        }
    }
}

/// Query result that is either the stored record or the record with its
/// references resolved.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MaybePopulated<Plain, Full> {
    Plain(Plain),
    Populated(Full),
}

impl<Plain, Full> MaybePopulated<Plain, Full> {
    pub fn populated(&self) -> Option<&Full> {
        match self {
            MaybePopulated::Populated(full) => Some(full),
            MaybePopulated::Plain(_) => None,
        }
    }

    pub fn plain(&self) -> Option<&Plain> {
        match self {
            MaybePopulated::Plain(plain) => Some(plain),
            MaybePopulated::Populated(_) => None,
        }
    }
}

pub type EmployeeView = MaybePopulated<Employee, PopulatedEmployee>;
pub type ProjectView = MaybePopulated<Project, PopulatedProject>;
pub type RequestView = MaybePopulated<StaffingRequest, PopulatedRequest>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignProject {
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRequest {
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignEmployee {
    pub employee_id: Uuid,
}
