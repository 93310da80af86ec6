use crate::calc::index::{build_index, IndexFilters};
use crate::calc::report::{
    build_question_report, build_report, build_student_history, build_student_report,
};
use crate::db::SqliteSource;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{calc_err, db_conn, optional_i64, parse_family, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::model::{TestFamily, TestKey};
use crate::source::AnalyticsSource;
use serde_json::json;
use tracing::debug;

/// `teacherId`, `family` and `testId`, shared by every per-test method.
fn test_params(req: &Request) -> Result<(i64, TestKey), serde_json::Value> {
    let teacher_id = required_i64(req, "teacherId")?;
    let family = parse_family(req)?;
    let id = required_i64(req, "testId")?;
    Ok((teacher_id, TestKey { family, id }))
}

fn parse_families(req: &Request) -> Result<Option<Vec<TestFamily>>, serde_json::Value> {
    let raw = match req.params.get("families") {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let Some(items) = raw.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            "families must be an array",
            Some(json!({ "families": raw })),
        ));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str().and_then(TestFamily::parse) {
            Some(f) if !out.contains(&f) => out.push(f),
            Some(_) => {}
            None => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "families must contain only: spelling, punctuation, stress, generic",
                    Some(json!({ "family": item })),
                ))
            }
        }
    }
    Ok(Some(out))
}

fn handle_test_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (teacher_id, key) = match test_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    debug!(teacher_id, family = key.family.as_str(), test_id = key.id, "reports.test.open");
    match build_report(&SqliteSource::new(conn), teacher_id, key, &state.options) {
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => calc_err(req, e),
    }
}

fn handle_test_questions(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (teacher_id, key) = match test_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match build_question_report(&SqliteSource::new(conn), teacher_id, key, &state.options) {
        Ok(questions) => ok(&req.id, json!(questions)),
        Err(e) => calc_err(req, e),
    }
}

fn handle_test_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (teacher_id, key) = match test_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match build_student_report(&SqliteSource::new(conn), teacher_id, key) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => calc_err(req, e),
    }
}

fn handle_student_attempts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (teacher_id, key) = match test_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match build_student_history(&SqliteSource::new(conn), teacher_id, key, student_id) {
        Ok(history) => ok(&req.id, json!(history)),
        Err(e) => calc_err(req, e),
    }
}

fn handle_index(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let teacher_id = match required_i64(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let filters = match (
        optional_i64(req, "subjectId"),
        optional_i64(req, "classId"),
        parse_families(req),
    ) {
        (Ok(subject_id), Ok(class_id), Ok(families)) => IndexFilters {
            subject_id,
            class_id,
            families,
        },
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };
    match build_index(&SqliteSource::new(conn), teacher_id, &filters) {
        Ok(rows) => ok(&req.id, json!({ "rows": rows })),
        Err(e) => calc_err(req, e),
    }
}

fn handle_index_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let teacher_id = match required_i64(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let source = SqliteSource::new(conn);
    let subjects = match source.subjects_for_teacher(teacher_id) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    let classes = match source.classes_for_teacher(teacher_id) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    ok(
        &req.id,
        json!({
            "subjects": subjects,
            "classes": classes,
            "families": TestFamily::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.test.open" => Some(handle_test_open(state, req)),
        "reports.test.questions" => Some(handle_test_questions(state, req)),
        "reports.test.students" => Some(handle_test_students(state, req)),
        "reports.student.attempts" => Some(handle_student_attempts(state, req)),
        "reports.index" => Some(handle_index(state, req)),
        "reports.index.options" => Some(handle_index_options(state, req)),
        _ => None,
    }
}
