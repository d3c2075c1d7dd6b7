use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use super::filter::{contains_ignore_case, delimited, matches_exact, overlaps, within};
use super::project::Project;
use super::request::StaffingRequest;
use crate::validation::{
    Validate, ValidationError, http_url, min_len, normalize_optional_set, normalize_set, not_empty,
    trim_in_place, trim_optional,
};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, AsRefStr, EnumString,
)]
pub enum EmployeeGrade {
    Junior,
    Middle,
    Senior,
    Lead,
}

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
pub enum EmployeeStatus {
    #[serde(rename = "On Project")]
    #[strum(serialize = "On Project")]
    OnProject,
    #[default]
    #[serde(rename = "On Bench")]
    #[strum(serialize = "On Bench")]
    OnBench,
}

/// How loaded an employee is with requests.
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
pub enum Workload {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Stored employee. `P` and `R` are the element types of the `projects` and
/// `requests` reference lists: ids by default, full records once populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee<P = Uuid, R = Uuid> {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub name: String,
    pub role: String,
    pub grade: EmployeeGrade,
    pub status: EmployeeStatus,
    pub team: String,
    pub sub_team: Option<String>,
    pub can_take_second_project: bool,
    pub can_work_on_ru_project: bool,
    pub has_higher_education: bool,
    pub workload: Workload,
    pub skills: Vec<String>,
    pub cv_link: Option<String>,
    pub projects: Vec<P>,
    pub requests: Vec<R>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type PopulatedEmployee = Employee<Project, StaffingRequest>;

impl Employee {
    pub fn from_create(input: CreateEmployee, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            name: input.name,
            role: input.role,
            grade: input.grade,
            status: input.status,
            team: input.team,
            sub_team: input.sub_team,
            can_take_second_project: input.can_take_second_project,
            can_work_on_ru_project: input.can_work_on_ru_project,
            has_higher_education: input.has_higher_education,
            workload: input.workload,
            skills: input.skills,
            cv_link: input.cv_link,
            projects: Vec::new(),
            requests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &EmployeePatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(grade) = patch.grade {
            self.grade = grade;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(team) = &patch.team {
            self.team = team.clone();
        }
        if let Some(sub_team) = &patch.sub_team {
            self.sub_team = Some(sub_team.clone());
        }
        if let Some(flag) = patch.can_take_second_project {
            self.can_take_second_project = flag;
        }
        if let Some(flag) = patch.can_work_on_ru_project {
            self.can_work_on_ru_project = flag;
        }
        if let Some(flag) = patch.has_higher_education {
            self.has_higher_education = flag;
        }
        if let Some(workload) = patch.workload {
            self.workload = workload;
        }
        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(cv_link) = &patch.cv_link {
            self.cv_link = Some(cv_link.clone());
        }
        self.updated_at = now;
    }

    pub fn populated(self, projects: Vec<Project>, requests: Vec<StaffingRequest>) -> PopulatedEmployee {
        Employee {
            id: self.id,
            employee_id: self.employee_id,
            name: self.name,
            role: self.role,
            grade: self.grade,
            status: self.status,
            team: self.team,
            sub_team: self.sub_team,
            can_take_second_project: self.can_take_second_project,
            can_work_on_ru_project: self.can_work_on_ru_project,
            has_higher_education: self.has_higher_education,
            workload: self.workload,
            skills: self.skills,
            cv_link: self.cv_link,
            projects,
            requests,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateEmployee {
    pub name: String,
    pub role: String,
    pub grade: EmployeeGrade,
    #[serde(default)]
    pub status: EmployeeStatus,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_team: Option<String>,
    #[serde(default)]
    pub can_take_second_project: bool,
    #[serde(default)]
    pub can_work_on_ru_project: bool,
    #[serde(default)]
    pub has_higher_education: bool,
    #[serde(default)]
    pub workload: Workload,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_link: Option<String>,
}

impl CreateEmployee {
    pub fn new(name: impl Into<String>, role: impl Into<String>, grade: EmployeeGrade) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            grade,
            status: EmployeeStatus::default(),
            team: "QA".into(),
            sub_team: None,
            can_take_second_project: false,
            can_work_on_ru_project: false,
            has_higher_education: false,
            workload: Workload::default(),
            skills: Vec::new(),
            cv_link: None,
        }
    }
}

impl Validate for CreateEmployee {
    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.role);
        trim_in_place(&mut self.team);
        trim_optional(&mut self.sub_team);
        trim_optional(&mut self.cv_link);
        normalize_set(&mut self.skills);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        min_len("name", &self.name, 2)?;
        not_empty("role", &self.role)?;
        not_empty("team", &self.team)?;
        if let Some(cv_link) = &self.cv_link {
            http_url("cvLink", cv_link)?;
        }
        Ok(())
    }
}

/// Partial update. Reference lists are deliberately absent: links change only
/// through the assign/remove operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmployeePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<EmployeeGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EmployeeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_take_second_project: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_work_on_ru_project: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_higher_education: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<Workload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_link: Option<String>,
}

impl Validate for EmployeePatch {
    fn normalize(&mut self) {
        trim_optional(&mut self.name);
        trim_optional(&mut self.role);
        trim_optional(&mut self.team);
        trim_optional(&mut self.sub_team);
        trim_optional(&mut self.cv_link);
        normalize_optional_set(&mut self.skills);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            min_len("name", name, 2)?;
        }
        if let Some(role) = &self.role {
            not_empty("role", role)?;
        }
        if let Some(team) = &self.team {
            not_empty("team", team)?;
        }
        if let Some(cv_link) = &self.cv_link {
            http_url("cvLink", cv_link)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    pub status: Option<EmployeeStatus>,
    pub grade: Option<EmployeeGrade>,
    pub role: Option<String>,
    pub team: Option<String>,
    pub name: Option<String>,
    pub workload: Option<Workload>,
    pub can_take_second_project: Option<bool>,
    pub can_work_on_ru_project: Option<bool>,
    pub has_higher_education: Option<bool>,
    #[serde(default, deserialize_with = "delimited")]
    pub skills: Option<Vec<String>>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub populate: bool,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        matches_exact(&employee.status, self.status.as_ref())
            && matches_exact(&employee.grade, self.grade.as_ref())
            && matches_exact(&employee.role, self.role.as_ref())
            && matches_exact(&employee.team, self.team.as_ref())
            && self
                .name
                .as_deref()
                .is_none_or(|name| contains_ignore_case(&employee.name, name))
            && matches_exact(&employee.workload, self.workload.as_ref())
            && matches_exact(
                &employee.can_take_second_project,
                self.can_take_second_project.as_ref(),
            )
            && matches_exact(
                &employee.can_work_on_ru_project,
                self.can_work_on_ru_project.as_ref(),
            )
            && matches_exact(
                &employee.has_higher_education,
                self.has_higher_education.as_ref(),
            )
            && overlaps(&employee.skills, self.skills.as_deref())
            && within(employee.created_at, self.created_after, self.created_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str) -> Employee {
        let mut input = CreateEmployee::new(name, "QA Engineer", EmployeeGrade::Middle);
        input.skills = vec!["Jest".into(), "Playwright".into()];
        Employee::from_create(input, Utc::now())
    }

    #[test]
    fn enums_use_display_strings_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&EmployeeStatus::OnProject).unwrap(),
            "\"On Project\""
        );
        assert_eq!(EmployeeStatus::OnBench.as_ref(), "On Bench");
        assert_eq!("On Bench".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::OnBench);
        assert_eq!("None".parse::<Workload>().unwrap(), Workload::None);
    }

    #[test]
    fn create_defaults_and_rejects_unknown_fields() {
        let parsed: CreateEmployee = serde_json::from_str(
            r#"{"name":"Ivan","role":"QA","grade":"Junior","team":"Core"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status, EmployeeStatus::OnBench);
        assert_eq!(parsed.workload, Workload::None);
        assert!(parsed.skills.is_empty());

        let with_links = serde_json::from_str::<CreateEmployee>(
            r#"{"name":"Ivan","role":"QA","grade":"Junior","team":"Core","projects":[]}"#,
        );
        assert!(with_links.is_err());
    }

    #[test]
    fn validation_trims_before_checking_length() {
        let mut input = CreateEmployee::new(" I ", "QA", EmployeeGrade::Lead);
        input.normalize();
        assert_eq!(input.name, "I");
        assert_eq!(input.validate().unwrap_err().field, "name");

        let mut input = CreateEmployee::new("Ivan", "QA", EmployeeGrade::Lead);
        input.cv_link = Some("cv.pdf".into());
        assert_eq!(input.validate().unwrap_err().field, "cvLink");
    }

    #[test]
    fn filter_combines_conditions() {
        let ivan = employee("Ivan Petrov");

        let by_name = EmployeeFilter {
            name: Some("ivan".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&ivan));

        let by_skill = EmployeeFilter {
            skills: Some(vec!["Cypress".into(), "Jest".into()]),
            grade: Some(EmployeeGrade::Middle),
            ..Default::default()
        };
        assert!(by_skill.matches(&ivan));

        let wrong_grade = EmployeeFilter {
            grade: Some(EmployeeGrade::Senior),
            ..Default::default()
        };
        assert!(!wrong_grade.matches(&ivan));

        let explicit_false = EmployeeFilter {
            has_higher_education: Some(true),
            ..Default::default()
        };
        assert!(!explicit_false.matches(&ivan));
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let mut ivan = employee("Ivan");
        let before = ivan.clone();
        let patch = EmployeePatch {
            grade: Some(EmployeeGrade::Senior),
            ..Default::default()
        };
        ivan.apply(&patch, Utc::now());

        assert_eq!(ivan.grade, EmployeeGrade::Senior);
        assert_eq!(ivan.name, before.name);
        assert_eq!(ivan.skills, before.skills);
        assert!(ivan.updated_at >= before.updated_at);
    }
}
