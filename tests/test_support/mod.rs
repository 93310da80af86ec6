#![allow(dead_code)]

use rusqlite::{params, Connection};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEACHER_ID: i64 = 9;
pub const OTHER_TEACHER_ID: i64 = 77;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_sidecar() -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_assessd");
    let mut child = Command::new(exe)
        .env_remove("ASSESSD_WORKSPACE")
        .env_remove("ASSESSD_TOP_MISTAKES")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn assessd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    /// Writes a line that gets no reply.
    pub fn send_silent(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write line");
        self.stdin.flush().expect("flush line");
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_default()
    }

    pub fn error_code(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
        value["error"]["code"].as_str().unwrap_or("").to_string()
    }

    pub fn select_workspace(&mut self, workspace: &Path) {
        self.request_ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
    }
}

/// Writes rows straight into a workspace database.
pub struct Seed {
    pub conn: Connection,
}

impl Seed {
    pub fn open(workspace: &Path) -> Self {
        Self {
            conn: assessd::db::open_db(workspace).expect("open workspace db"),
        }
    }

    pub fn user(&self, id: i64, last: &str, first: &str) {
        self.conn
            .execute(
                "INSERT INTO users(id, last_name, first_name) VALUES (?, ?, ?)",
                params![id, last, first],
            )
            .expect("insert user");
    }

    pub fn subject(&self, id: i64, name: &str) {
        self.conn
            .execute("INSERT INTO subjects(id, name) VALUES (?, ?)", params![id, name])
            .expect("insert subject");
    }

    pub fn class(&self, id: i64, name: &str, teacher_id: i64) {
        self.conn
            .execute(
                "INSERT INTO classes(id, name, teacher_id) VALUES (?, ?, ?)",
                params![id, name, teacher_id],
            )
            .expect("insert class");
    }

    pub fn student(&self, id: i64, user_id: i64, class_id: Option<i64>) {
        self.conn
            .execute(
                "INSERT INTO students(id, user_id, class_id) VALUES (?, ?, ?)",
                params![id, user_id, class_id],
            )
            .expect("insert student");
    }

    pub fn assignment(&self, id: i64, title: &str, subject_id: Option<i64>, teacher_id: i64, classes: &[i64]) {
        self.conn
            .execute(
                "INSERT INTO assignments(id, title, subject_id, teacher_id) VALUES (?, ?, ?, ?)",
                params![id, title, subject_id, teacher_id],
            )
            .expect("insert assignment");
        for class_id in classes {
            self.conn
                .execute(
                    "INSERT INTO assignment_classes(assignment_id, class_id) VALUES (?, ?)",
                    params![id, class_id],
                )
                .expect("link class");
        }
    }

    pub fn test(&self, family: &str, id: i64, title: &str, assignment_id: Option<i64>, teacher_id: i64, max_attempts: i64) {
        let sql = format!(
            "INSERT INTO {}_tests(id, title, assignment_id, teacher_id, max_attempts) VALUES (?, ?, ?, ?, ?)",
            family
        );
        self.conn
            .execute(&sql, params![id, title, assignment_id, teacher_id, max_attempts])
            .expect("insert test");
    }

    pub fn spelling_question(&self, id: i64, test_id: i64, order_index: i64, word_with_gap: &str, correct: &str) {
        self.conn
            .execute(
                "INSERT INTO spelling_questions(id, test_id, order_index, points, word_with_gap, correct_letter)
                 VALUES (?, ?, ?, 1, ?, ?)",
                params![id, test_id, order_index, word_with_gap, correct],
            )
            .expect("insert question");
    }

    #[allow(clippy::too_many_arguments)]
    pub fn result(
        &self,
        family: &str,
        id: i64,
        test_id: i64,
        student_id: i64,
        attempt_number: i64,
        started_at: &str,
        completed_at: Option<&str>,
        score: f64,
        max_score: f64,
        grade: Option<i64>,
    ) {
        let percentage = if max_score > 0.0 { 100.0 * score / max_score } else { 0.0 };
        let sql = format!(
            "INSERT INTO {}_results(id, test_id, student_id, attempt_number, started_at, completed_at,
                 score, max_score, percentage, grade, is_completed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            family
        );
        self.conn
            .execute(
                &sql,
                params![
                    id,
                    test_id,
                    student_id,
                    attempt_number,
                    started_at,
                    completed_at,
                    score,
                    max_score,
                    percentage,
                    grade,
                    completed_at.is_some() as i64
                ],
            )
            .expect("insert result");
    }

    pub fn spelling_answer(&self, id: i64, result_id: i64, question_id: i64, correct: bool, letter: &str) {
        self.conn
            .execute(
                "INSERT INTO spelling_answers(id, result_id, question_id, is_correct, chosen_letter)
                 VALUES (?, ?, ?, ?, ?)",
                params![id, result_id, question_id, correct as i64, letter],
            )
            .expect("insert answer");
    }
}

/// Class 7A of teacher 9 holds Ivanova (11), Petrov (12) and Sidorov (13).
/// Spelling test 3 sits on assignment 5 (subject Russian). Ivanova finished
/// 8/10 with grade 4, Petrov is mid-test and Sidorov has not started.
pub fn seed_scenario(workspace: &Path) -> Seed {
    let seed = Seed::open(workspace);
    seed.user(1, "Ivanova", "Anna");
    seed.user(2, "Petrov", "Oleg");
    seed.user(3, "Sidorov", "Ivan");
    seed.subject(1, "Russian");
    seed.class(1, "7A", TEACHER_ID);
    seed.student(11, 1, Some(1));
    seed.student(12, 2, Some(1));
    seed.student(13, 3, Some(1));
    seed.assignment(5, "Week 1", Some(1), TEACHER_ID, &[1]);
    seed.test("spelling", 3, "Vowels", Some(5), TEACHER_ID, 2);
    seed.spelling_question(31, 3, 1, "м_локо", "о");
    seed.spelling_question(32, 3, 2, "д_ревня", "е");

    seed.result(
        "spelling",
        100,
        3,
        11,
        1,
        "2025-01-10 09:00:00",
        Some("2025-01-10 09:10:00"),
        8.0,
        10.0,
        Some(4),
    );
    seed.result("spelling", 101, 3, 12, 1, "2025-01-10 09:02:00", None, 0.0, 0.0, None);

    seed.spelling_answer(1, 100, 31, true, "о");
    seed.spelling_answer(2, 100, 32, false, "а");
    seed.spelling_answer(3, 101, 31, false, "а");
    seed.spelling_answer(4, 101, 32, false, "и");
    seed
}
