mod test_support;

use serde_json::json;
use test_support::{seed_scenario, spawn_sidecar, temp_dir, TEACHER_ID};

fn params(student_id: i64) -> serde_json::Value {
    json!({
        "teacherId": TEACHER_ID,
        "family": "spelling",
        "testId": 3,
        "studentId": student_id,
    })
}

#[test]
fn history_lists_attempts_and_marks_best_and_latest() {
    let workspace = temp_dir("assessd-student-history");
    let seed = seed_scenario(&workspace);
    seed.result(
        "spelling",
        102,
        3,
        11,
        2,
        "2025-01-11 09:00:00",
        Some("2025-01-11 09:05:00"),
        6.0,
        10.0,
        Some(3),
    );
    drop(seed);

    let mut sidecar = spawn_sidecar();
    sidecar.select_workspace(&workspace);
    let history = sidecar.request_ok("reports.student.attempts", params(11));

    assert_eq!(history["displayName"], json!("Ivanova, Anna"));
    assert_eq!(history["onRoster"], json!(true));
    let attempts = history["attempts"].as_array().expect("attempts");
    let ids: Vec<i64> = attempts.iter().filter_map(|a| a["attemptId"].as_i64()).collect();
    assert_eq!(ids, vec![100, 102]);
    assert_eq!(attempts[1]["durationSeconds"].as_f64(), Some(300.0));
    assert_eq!(history["bestAttemptId"], json!(100));
    assert_eq!(history["latestAttemptId"], json!(102));

    let students = sidecar.request_ok(
        "reports.test.students",
        json!({ "teacherId": TEACHER_ID, "family": "spelling", "testId": 3 }),
    );
    let ivanova = &students["students"][0];
    assert_eq!(ivanova["attemptsUsed"], json!(2));
    assert_eq!(ivanova["attemptsRemaining"], json!(0));
    assert_eq!(ivanova["latestResult"]["attemptId"], json!(102));
    assert_eq!(ivanova["totalTimeSpentSeconds"].as_f64(), Some(900.0));
}

#[test]
fn off_roster_student_is_reported_but_flagged() {
    let workspace = temp_dir("assessd-student-off-roster");
    let seed = seed_scenario(&workspace);
    seed.user(8, "Zaitsev", "Pavel");
    seed.student(40, 8, None);
    seed.result(
        "spelling",
        103,
        3,
        40,
        1,
        "2025-01-12 09:00:00",
        Some("2025-01-12 09:03:00"),
        10.0,
        10.0,
        Some(5),
    );
    drop(seed);

    let mut sidecar = spawn_sidecar();
    sidecar.select_workspace(&workspace);
    let history = sidecar.request_ok("reports.student.attempts", params(40));
    assert_eq!(history["onRoster"], json!(false));
    assert_eq!(history["attempts"].as_array().map(Vec::len), Some(1));

    let report = sidecar.request_ok(
        "reports.test.open",
        json!({ "teacherId": TEACHER_ID, "family": "spelling", "testId": 3 }),
    );
    assert_eq!(report["offRosterAttemptCount"], json!(1));
    assert_eq!(report["statistics"]["completedCount"], json!(2));
    assert_eq!(report["students"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["warnings"][0]["code"], json!("off_roster_attempt"));
}

#[test]
fn unknown_student_is_not_found() {
    let workspace = temp_dir("assessd-student-missing");
    seed_scenario(&workspace);

    let mut sidecar = spawn_sidecar();
    sidecar.select_workspace(&workspace);
    let resp = sidecar.request("reports.student.attempts", params(999));
    assert_eq!(resp["error"]["code"], json!("not_found"));
    assert_eq!(resp["error"]["details"]["studentId"], json!(999));
}
