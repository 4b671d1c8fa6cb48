mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use common::{gateway, MockTransport};
use moodle_gateway::app::course_use_case::CourseUseCase;
use moodle_gateway::app::envelope::{FanOutEnvelope, UsecaseEnvelope};
use moodle_gateway::app::submissions_use_case::{
    GradeMark, SubmissionsFilter, SubmissionsWithGradesUseCase,
};
use moodle_gateway::app::unenroll_use_case::{UnenrolStatus, UnenrollSuspendedUseCase};
use moodle_gateway::error::{ErrorKind, TransportError};
use moodle_gateway::Operation;

fn submissions_payload() -> serde_json::Value {
    json!({
        "assignments": [{
            "assignmentid": 5,
            "submissions": [
                {"id": 11, "userid": 1, "status": "submitted", "timemodified": 1704067200},
                {"id": 12, "userid": 2, "status": "submitted", "timemodified": 1704067200}
            ]
        }],
        "warnings": []
    })
}

fn grades_payload() -> serde_json::Value {
    json!({
        "assignments": [{
            "assignmentid": 5,
            "grades": [{"id": 1, "userid": 1, "grade": "85.00000"}]
        }],
        "warnings": []
    })
}

#[tokio::test]
async fn submissions_are_joined_with_grades() -> Result<()> {
    let transport = Arc::new(
        MockTransport::new()
            .respond(Operation::ModAssignGetSubmissions, submissions_payload())
            .respond(Operation::ModAssignGetGrades, grades_payload()),
    );
    let usecase = SubmissionsWithGradesUseCase::new(Arc::new(gateway(&transport)));

    let joined = usecase
        .execute(&SubmissionsFilter {
            assignment_id: Some(5),
            student_id: None,
        })
        .await?;

    assert_eq!(joined.len(), 2);
    assert_eq!(joined[0].submission.userid, 1);
    assert_eq!(joined[0].grade, GradeMark::Graded(85.0));
    assert_eq!(joined[0].submitted_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    assert_eq!(joined[1].submission.userid, 2);
    assert_eq!(joined[1].grade, GradeMark::NotGraded);

    let envelope = serde_json::to_value(UsecaseEnvelope::ok(joined))?;
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["data"][0]["grade"].as_f64(), Some(85.0));
    assert_eq!(envelope["data"][0]["submitted_at"], "2024-01-01T00:00:00.000Z");
    assert_eq!(envelope["data"][1]["grade"], "Not graded");

    let grades_request = transport
        .calls()
        .into_iter()
        .find(|r| r.operation == Operation::ModAssignGetGrades)
        .expect("grades fetched");
    assert_eq!(grades_request.param("assignmentids[0]"), Some("5"));
    Ok(())
}

#[tokio::test]
async fn student_filter_returns_only_that_student() -> Result<()> {
    let transport = Arc::new(
        MockTransport::new()
            .respond(Operation::ModAssignGetSubmissions, submissions_payload())
            .respond(Operation::ModAssignGetGrades, grades_payload()),
    );
    let usecase = SubmissionsWithGradesUseCase::new(Arc::new(gateway(&transport)));

    let joined = usecase
        .execute(&SubmissionsFilter {
            assignment_id: Some(5),
            student_id: Some(2),
        })
        .await?;

    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].submission.userid, 2);
    Ok(())
}

#[tokio::test]
async fn grades_are_fetched_for_returned_assignments_when_unfiltered() -> Result<()> {
    let transport = Arc::new(
        MockTransport::new()
            .respond(Operation::ModAssignGetSubmissions, submissions_payload())
            .respond(Operation::ModAssignGetGrades, grades_payload()),
    );
    let usecase = SubmissionsWithGradesUseCase::new(Arc::new(gateway(&transport)));

    usecase.execute(&SubmissionsFilter::default()).await?;

    let calls = transport.calls();
    assert_eq!(calls[0].param("assignmentids[0]"), None);
    assert_eq!(calls[1].param("assignmentids[0]"), Some("5"));
    Ok(())
}

#[tokio::test]
async fn failed_grade_fetch_aborts_the_join() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(Operation::ModAssignGetSubmissions, submissions_payload())
            .respond(
                Operation::ModAssignGetGrades,
                json!({"exception": "required_capability_exception", "errorcode": "nopermissions", "message": "No permission"}),
            ),
    );
    let usecase = SubmissionsWithGradesUseCase::new(Arc::new(gateway(&transport)));

    let result = usecase
        .execute(&SubmissionsFilter {
            assignment_id: Some(5),
            student_id: None,
        })
        .await;
    let envelope = UsecaseEnvelope::from(result);
    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error.map(|e| e.kind), Some(ErrorKind::Remote));
}

#[tokio::test]
async fn malformed_submissions_abort_before_grades_are_fetched() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(Operation::ModAssignGetSubmissions, json!({"assignments": [{"assignmentid": 5}]}))
            .respond(Operation::ModAssignGetGrades, grades_payload()),
    );
    let usecase = SubmissionsWithGradesUseCase::new(Arc::new(gateway(&transport)));

    let err = usecase.execute(&SubmissionsFilter::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    assert!(err.raw_payload().is_some());
    assert_eq!(transport.calls_for(Operation::ModAssignGetGrades), 0);
}

#[tokio::test]
async fn no_suspended_users_means_no_outcomes() -> Result<()> {
    let transport = Arc::new(MockTransport::new().respond(Operation::CoreEnrolGetEnrolledUsers, json!([])));
    let usecase = UnenrollSuspendedUseCase::new(Arc::new(gateway(&transport)), 4);

    let outcomes = usecase.execute(42).await?;

    assert!(outcomes.is_empty());
    assert_eq!(transport.calls_for(Operation::EnrolManualUnenrolUsers), 0);
    let request = &transport.calls()[0];
    assert_eq!(request.param("courseid"), Some("42"));
    assert_eq!(request.param("options[0][name]"), Some("onlysuspended"));
    assert_eq!(request.param("options[0][value]"), Some("1"));
    Ok(())
}

#[tokio::test]
async fn one_failed_unenrolment_does_not_stop_the_others() -> Result<()> {
    let transport = Arc::new(
        MockTransport::new()
            .respond(
                Operation::CoreEnrolGetEnrolledUsers,
                json!([
                    {"id": 3, "firstname": "A", "lastname": "One"},
                    {"id": 4, "firstname": "B", "lastname": "Two"},
                    {"id": 5, "firstname": "C", "lastname": "Three"}
                ]),
            )
            .respond_with(Operation::EnrolManualUnenrolUsers, |request| {
                if request.param("enrolments[0][userid]") == Some("4") {
                    Err(TransportError::Status {
                        status: 503,
                        body: "maintenance".to_string(),
                    })
                } else {
                    Ok(serde_json::Value::Null)
                }
            }),
    );
    let usecase = UnenrollSuspendedUseCase::new(Arc::new(gateway(&transport)), 2);

    let mut outcomes = usecase.execute(42).await?;
    outcomes.sort_by_key(|o| o.userid);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(transport.calls_for(Operation::EnrolManualUnenrolUsers), 3);
    assert_eq!(outcomes[0].status, UnenrolStatus::Unenrolled);
    assert!(matches!(
        &outcomes[1].status,
        UnenrolStatus::Failed { error } if error.kind == ErrorKind::Transport
    ));
    assert_eq!(outcomes[2].status, UnenrolStatus::Unenrolled);

    let envelope = FanOutEnvelope::from_outcomes(outcomes, |o| o.is_success());
    assert!(envelope.success);
    assert_eq!((envelope.succeeded, envelope.failed), (2, 1));
    Ok(())
}

#[tokio::test]
async fn failed_suspended_fetch_is_a_single_error() {
    let transport = Arc::new(MockTransport::new().respond_with(Operation::CoreEnrolGetEnrolledUsers, |_| {
        Err(TransportError::Connect("connection refused".to_string()))
    }));
    let usecase = UnenrollSuspendedUseCase::new(Arc::new(gateway(&transport)), 4);

    let err = usecase.execute(42).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.calls_for(Operation::EnrolManualUnenrolUsers), 0);
}

#[tokio::test]
async fn assignments_come_from_the_first_course() -> Result<()> {
    let transport = Arc::new(MockTransport::new().respond(
        Operation::ModAssignGetAssignments,
        json!({
            "courses": [{
                "id": 2,
                "fullname": "Rhetoric",
                "assignments": [{
                    "id": 5, "course": 2, "name": "Essay", "duedate": 0,
                    "allowsubmissionsfromdate": 0, "grade": 100,
                    "timemodified": 1704067200, "cutoffdate": 0
                }]
            }],
            "warnings": []
        }),
    ));
    let course = CourseUseCase::new(Arc::new(gateway(&transport)));

    let assignments = course.assignments("2").await?;
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].name, "Essay");
    Ok(())
}

#[tokio::test]
async fn course_without_assignments_yields_an_empty_list() -> Result<()> {
    let transport = Arc::new(
        MockTransport::new().respond(Operation::ModAssignGetAssignments, json!({"courses": []})),
    );
    let course = CourseUseCase::new(Arc::new(gateway(&transport)));

    assert!(course.assignments("2").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn submission_content_extracts_text_and_files() -> Result<()> {
    let transport = Arc::new(MockTransport::new().respond(
        Operation::ModAssignGetSubmissionStatus,
        json!({
            "lastattempt": {
                "submission": {
                    "id": 11, "userid": 1, "status": "submitted", "timemodified": 1704067200,
                    "plugins": [
                        {"type": "onlinetext", "name": "Online text",
                         "editorfields": [{"name": "onlinetext", "text": "<p>My essay</p>", "format": 1}]},
                        {"type": "file", "name": "File submissions",
                         "fileareas": [{"area": "submission_files",
                                        "files": [{"filename": "essay.pdf", "fileurl": "https://moodle.test/f/essay.pdf"}]}]}
                    ]
                },
                "gradingstatus": "notgraded"
            },
            "warnings": []
        }),
    ));
    let course = CourseUseCase::new(Arc::new(gateway(&transport)));

    let content = course.submission_content(5, 1).await?;
    assert_eq!(content.text.as_deref(), Some("<p>My essay</p>"));
    assert_eq!(content.files.len(), 1);
    assert_eq!(content.files[0].filename, "essay.pdf");

    let request = &transport.calls()[0];
    assert_eq!(request.param("assignid"), Some("5"));
    assert_eq!(request.param("userid"), Some("1"));
    Ok(())
}
