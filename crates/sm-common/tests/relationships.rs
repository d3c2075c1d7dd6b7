use std::sync::Arc;

use chrono::Utc;
use sm_common::api::{
    CreateEmployee, CreateProject, CreateRequest, EmployeeFilter, EmployeeGrade, EmployeePatch,
    EmployeeView, ProjectView, RequestView,
};
use sm_common::db::MemoryStore;
use sm_common::{ServiceError, Staffing, StaffingOptions};
use uuid::Uuid;

fn staffing() -> Staffing {
    Staffing::new(
        Arc::new(MemoryStore::new()),
        StaffingOptions {
            dictionary_validation: false,
        },
    )
}

async fn employee(staffing: &Staffing, name: &str) -> Uuid {
    staffing
        .employees()
        .create(CreateEmployee::new(name, "QA Engineer", EmployeeGrade::Middle))
        .await
        .unwrap()
        .id
}

async fn project(staffing: &Staffing, name: &str) -> Uuid {
    staffing
        .projects()
        .create(CreateProject::new(name, "Banking", Utc::now()))
        .await
        .unwrap()
        .id
}

async fn request(staffing: &Staffing, name: &str) -> Uuid {
    staffing
        .requests()
        .create(CreateRequest::new(name, "Middle", "Remote"))
        .await
        .unwrap()
        .id
}

fn plain_request(view: RequestView) -> sm_common::api::StaffingRequest {
    match view {
        RequestView::Plain(request) => request,
        RequestView::Populated(_) => panic!("expected a plain request"),
    }
}

fn plain_employee(view: EmployeeView) -> sm_common::api::Employee {
    match view {
        EmployeeView::Plain(employee) => employee,
        EmployeeView::Populated(_) => panic!("expected a plain employee"),
    }
}

fn plain_project(view: ProjectView) -> sm_common::api::Project {
    match view {
        ProjectView::Plain(project) => project,
        ProjectView::Populated(_) => panic!("expected a plain project"),
    }
}

#[tokio::test]
async fn created_employee_reads_back_unchanged() {
    let staffing = staffing();
    let mut input = CreateEmployee::new("  Ivan Petrov ", "QA Engineer", EmployeeGrade::Senior);
    input.skills = vec!["Postman".into()];
    input.can_take_second_project = true;

    let created = staffing.employees().create(input).await.unwrap();
    let found = plain_employee(staffing.employees().find_by_id(created.id, false).await.unwrap());

    assert_eq!(found, created);
    assert_eq!(found.name, "Ivan Petrov");
    assert_eq!(found.skills, vec!["Postman".to_string()]);
    assert!(found.can_take_second_project);
    assert!(found.projects.is_empty());
}

#[tokio::test]
async fn removed_employee_is_not_found() {
    let staffing = staffing();
    let id = employee(&staffing, "Ivan").await;

    staffing.employees().remove(id).await.unwrap();

    let err = staffing.employees().find_by_id(id, false).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == &format!("Employee with ID \"{id}\" not found")));
    assert!(matches!(
        staffing.employees().remove(id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn assigning_twice_is_the_same_as_once() {
    let staffing = staffing();
    let e = employee(&staffing, "Ivan").await;
    let p = project(&staffing, "Atlas").await;

    staffing.employees().assign_project(e, p).await.unwrap();
    staffing.employees().assign_project(e, p).await.unwrap();

    let employee = plain_employee(staffing.employees().find_by_id(e, false).await.unwrap());
    let project = plain_project(staffing.projects().find_by_id(p, false).await.unwrap());
    assert_eq!(employee.projects, vec![p]);
    assert_eq!(project.team, vec![e]);
}

#[tokio::test]
async fn unlinking_is_idempotent_even_for_unknown_links() {
    let staffing = staffing();
    let e = employee(&staffing, "Ivan").await;
    let p = project(&staffing, "Atlas").await;

    staffing.projects().remove_employee(p, e).await.unwrap();
    staffing.projects().remove_employee(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

    staffing.projects().assign_employee(p, e).await.unwrap();
    staffing.projects().remove_employee(p, e).await.unwrap();
    staffing.projects().remove_employee(p, e).await.unwrap();

    let employee = plain_employee(staffing.employees().find_by_id(e, false).await.unwrap());
    assert!(employee.projects.is_empty());
}

#[tokio::test]
async fn populated_views_resolve_both_sides() {
    let staffing = staffing();
    let e = employee(&staffing, "Ivan").await;
    let p = project(&staffing, "Atlas").await;
    staffing.employees().assign_project(e, p).await.unwrap();

    let employee = staffing.employees().find_by_id(e, true).await.unwrap();
    let employee = employee.populated().expect("populated employee");
    assert_eq!(employee.projects.len(), 1);
    assert_eq!(employee.projects[0].id, p);

    let project = staffing.projects().find_by_id(p, true).await.unwrap();
    let project = project.populated().expect("populated project");
    assert_eq!(project.team.len(), 1);
    assert_eq!(project.team[0].name, "Ivan");
}

#[tokio::test]
async fn deleting_a_project_strips_it_from_its_team() {
    let staffing = staffing();
    let e1 = employee(&staffing, "Ivan").await;
    let e2 = employee(&staffing, "Olga").await;
    let p = project(&staffing, "Atlas").await;
    staffing.projects().assign_employee(p, e1).await.unwrap();
    staffing.projects().assign_employee(p, e2).await.unwrap();

    staffing.projects().remove(p).await.unwrap();

    for id in [e1, e2] {
        let employee = plain_employee(staffing.employees().find_by_id(id, false).await.unwrap());
        assert!(employee.projects.is_empty(), "{} still references project", employee.name);
    }
}

#[tokio::test]
async fn name_filter_is_case_insensitive() {
    let staffing = staffing();
    employee(&staffing, "Ivan").await;
    employee(&staffing, "ivan").await;
    employee(&staffing, "Olga").await;

    let filter = EmployeeFilter {
        name: Some("ivan".into()),
        ..EmployeeFilter::default()
    };
    let found = staffing.employees().find_all(&filter).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn duplicate_employee_name_conflicts() {
    let staffing = staffing();
    employee(&staffing, "Ivan").await;

    let err = staffing
        .employees()
        .create(CreateEmployee::new("Ivan", "AQA", EmployeeGrade::Lead))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn project_created_with_team_links_members_back() {
    let staffing = staffing();
    let e = employee(&staffing, "Ivan").await;

    let mut input = CreateProject::new("Atlas", "Banking", Utc::now());
    input.team = vec![e, e];
    let created = staffing.projects().create(input).await.unwrap();
    assert_eq!(created.team, vec![e]);

    let employee = plain_employee(staffing.employees().find_by_id(e, false).await.unwrap());
    assert_eq!(employee.projects, vec![created.id]);

    let ghost = Uuid::new_v4();
    let mut input = CreateProject::new("Borealis", "Retail", Utc::now());
    input.team = vec![ghost];
    let err = staffing.projects().create(input).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn assign_then_unassign_scenario() {
    let staffing = staffing();
    let a = employee(&staffing, "Anna").await;
    let b = project(&staffing, "Beacon").await;

    staffing.employees().assign_project(a, b).await.unwrap();
    let employee = plain_employee(staffing.employees().find_by_id(a, false).await.unwrap());
    let project = plain_project(staffing.projects().find_by_id(b, false).await.unwrap());
    assert_eq!(employee.projects, vec![b]);
    assert_eq!(project.team, vec![a]);

    staffing.projects().remove_employee(b, a).await.unwrap();
    let employee = plain_employee(staffing.employees().find_by_id(a, false).await.unwrap());
    let project = plain_project(staffing.projects().find_by_id(b, false).await.unwrap());
    assert!(employee.projects.is_empty());
    assert!(project.team.is_empty());
}

#[tokio::test]
async fn deleting_a_request_strips_it_from_employees_and_projects() {
    let staffing = staffing();
    let e = employee(&staffing, "Ivan").await;
    let p = project(&staffing, "Atlas").await;
    let kept = request(&staffing, "Manual QA").await;
    let removed = request(&staffing, "Automation QA").await;

    staffing.employees().assign_request(e, removed).await.unwrap();
    staffing.projects().assign_request(p, kept).await.unwrap();
    staffing.projects().assign_request(p, removed).await.unwrap();

    staffing.requests().remove(removed).await.unwrap();

    let employee = plain_employee(staffing.employees().find_by_id(e, false).await.unwrap());
    let project = plain_project(staffing.projects().find_by_id(p, false).await.unwrap());
    assert!(employee.requests.is_empty());
    assert_eq!(project.requests, vec![kept]);
}

#[tokio::test]
async fn deleting_a_project_clears_the_request_slot() {
    let staffing = staffing();
    let p = project(&staffing, "Atlas").await;
    let r = request(&staffing, "Manual QA").await;
    staffing.requests().assign_project(r, p).await.unwrap();

    let linked = plain_request(staffing.requests().find_by_id(r, false).await.unwrap());
    assert_eq!(linked.project, Some(p));

    staffing.projects().remove(p).await.unwrap();

    let request = plain_request(staffing.requests().find_by_id(r, false).await.unwrap());
    assert_eq!(request.project, None);
}

#[tokio::test]
async fn updating_a_missing_employee_is_not_found_before_conflict() {
    let staffing = staffing();
    employee(&staffing, "Ivan").await;
    let missing = Uuid::new_v4();

    let patch = EmployeePatch {
        name: Some("Ivan".into()),
        ..EmployeePatch::default()
    };
    let err = staffing.employees().update(missing, patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == &format!("Employee with ID \"{missing}\" not found")));
}

#[tokio::test]
async fn skill_and_technology_lists_are_stored_as_sets() {
    let staffing = staffing();
    let mut input = CreateEmployee::new("Ivan", "QA Engineer", EmployeeGrade::Middle);
    input.skills = vec![" Jest".into(), "Jest".into(), "Postman ".into()];
    let employee = staffing.employees().create(input).await.unwrap();
    assert_eq!(employee.skills, vec!["Jest".to_string(), "Postman".to_string()]);

    let mut input = CreateRequest::new("Manual QA", "Middle", "Remote");
    input.technologies = vec!["Java".into(), " Java ".into(), String::new()];
    let request = staffing.requests().create(input).await.unwrap();
    assert_eq!(request.technologies, vec!["Java".to_string()]);
}
