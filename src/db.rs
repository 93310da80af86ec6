use crate::calc::CalcError;
use crate::families::{self, answer_detail_columns, answer_from_row, question_detail_columns, question_from_row};
use crate::model::{
    AnswerRecord, AssignmentInfo, Attempt, ClassInfo, QuestionRef, Student, SubjectInfo,
    TestFamily, TestInfo, TestKey,
};
use crate::source::AnalyticsSource;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error};

pub const DB_FILE_NAME: &str = "assessd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    apply_schema(&conn)?;
    debug!(path = %db_path.display(), "workspace database opened");
    Ok(conn)
}

pub fn apply_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            teacher_id INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_teacher ON classes(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            class_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES users(id),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            subject_id INTEGER,
            teacher_id INTEGER NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignment_classes(
            assignment_id INTEGER NOT NULL,
            class_id INTEGER NOT NULL,
            PRIMARY KEY(assignment_id, class_id),
            FOREIGN KEY(assignment_id) REFERENCES assignments(id),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;

    for family in TestFamily::ALL {
        for ddl in families::schema(family) {
            conn.execute(&ddl, [])?;
        }
    }
    Ok(())
}

/// Ids bound per `IN (...)` query; keeps every statement well under
/// SQLite's host parameter limit.
const IN_CHUNK: usize = 500;

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

fn int_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

fn db_err(e: rusqlite::Error) -> CalcError {
    error!(error = %e, "analytics query failed");
    CalcError::db(e)
}

fn test_from_row(family: TestFamily, r: &Row<'_>) -> rusqlite::Result<TestInfo> {
    Ok(TestInfo {
        key: TestKey {
            family,
            id: r.get(0)?,
        },
        title: r.get(1)?,
        assignment_id: r.get(2)?,
        teacher_id: r.get(3)?,
        max_attempts: r.get(4)?,
        is_active: r.get::<_, i64>(5)? != 0,
        show_hints: r.get::<_, i64>(6)? != 0,
        show_answers: r.get::<_, i64>(7)? != 0,
    })
}

fn attempt_from_row(r: &Row<'_>) -> rusqlite::Result<Attempt> {
    Ok(Attempt {
        id: r.get(0)?,
        test_id: r.get(1)?,
        student_id: r.get(2)?,
        attempt_number: r.get(3)?,
        started_at: r.get(4)?,
        completed_at: r.get(5)?,
        score: r.get(6)?,
        max_score: r.get(7)?,
        percentage: r.get(8)?,
        grade: r.get(9)?,
        completed: r.get::<_, i64>(10)? != 0,
    })
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        user_id: r.get(1)?,
        class_id: r.get(2)?,
    })
}

const TEST_COLUMNS: &str =
    "id, title, assignment_id, teacher_id, max_attempts, is_active, show_hints, show_answers";
const RESULT_COLUMNS: &str = "id, test_id, student_id, attempt_number, started_at, completed_at, score, max_score, percentage, grade, is_completed";

/// `AnalyticsSource` over a workspace database.
pub struct SqliteSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl AnalyticsSource for SqliteSource<'_> {
    fn find_test(&self, key: TestKey) -> Result<Option<TestInfo>, CalcError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            TEST_COLUMNS,
            families::tables(key.family).tests
        );
        self.conn
            .query_row(&sql, [key.id], |r| test_from_row(key.family, r))
            .optional()
            .map_err(db_err)
    }

    fn tests_for_teacher(
        &self,
        family: TestFamily,
        teacher_id: i64,
    ) -> Result<Vec<TestInfo>, CalcError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE teacher_id = ? ORDER BY id",
            TEST_COLUMNS,
            families::tables(family).tests
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        stmt.query_map([teacher_id], |r| test_from_row(family, r))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)
    }

    fn find_assignment(&self, assignment_id: i64) -> Result<Option<AssignmentInfo>, CalcError> {
        self.conn
            .query_row(
                "SELECT a.id, a.title, a.subject_id, s.name
                 FROM assignments a
                 LEFT JOIN subjects s ON s.id = a.subject_id
                 WHERE a.id = ?",
                [assignment_id],
                |r| {
                    Ok(AssignmentInfo {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        subject_id: r.get(2)?,
                        subject_name: r.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)
    }

    fn classes_for_assignment(&self, assignment_id: i64) -> Result<Vec<ClassInfo>, CalcError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.id, c.name
                 FROM assignment_classes ac
                 JOIN classes c ON c.id = ac.class_id
                 WHERE ac.assignment_id = ?
                 ORDER BY c.name, c.id",
            )
            .map_err(db_err)?;
        stmt.query_map([assignment_id], |r| {
            Ok(ClassInfo {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)
    }

    fn students_for_class(&self, class_id: i64) -> Result<Vec<Student>, CalcError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, class_id
                 FROM students
                 WHERE class_id = ?
                 ORDER BY id",
            )
            .map_err(db_err)?;
        stmt.query_map([class_id], student_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)
    }

    fn find_student(&self, student_id: i64) -> Result<Option<Student>, CalcError> {
        self.conn
            .query_row(
                "SELECT id, user_id, class_id FROM students WHERE id = ?",
                [student_id],
                student_from_row,
            )
            .optional()
            .map_err(db_err)
    }

    fn attempts_for_test(&self, key: TestKey) -> Result<Vec<Attempt>, CalcError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE test_id = ? ORDER BY id",
            RESULT_COLUMNS,
            families::tables(key.family).results
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        stmt.query_map([key.id], attempt_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)
    }

    fn attempts_for_student_and_test(
        &self,
        student_id: i64,
        key: TestKey,
    ) -> Result<Vec<Attempt>, CalcError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE test_id = ? AND student_id = ? ORDER BY attempt_number, id",
            RESULT_COLUMNS,
            families::tables(key.family).results
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        stmt.query_map([key.id, student_id], attempt_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)
    }

    fn questions_for_test(&self, key: TestKey) -> Result<Vec<QuestionRef>, CalcError> {
        let sql = format!(
            "SELECT id, test_id, order_index, points, {} FROM {} WHERE test_id = ? ORDER BY order_index, id",
            question_detail_columns(key.family),
            families::tables(key.family).questions
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        stmt.query_map([key.id], |r| question_from_row(key.family, r))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)
    }

    fn answers_for_question(
        &self,
        family: TestFamily,
        question_id: i64,
    ) -> Result<Vec<AnswerRecord>, CalcError> {
        Ok(self
            .answers_for_questions(family, &[question_id])?
            .remove(&question_id)
            .unwrap_or_default())
    }

    fn display_name(&self, user_id: i64) -> Result<Option<String>, CalcError> {
        Ok(self.display_names(&[user_id])?.remove(&user_id))
    }

    fn subjects_for_teacher(&self, teacher_id: i64) -> Result<Vec<SubjectInfo>, CalcError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT s.id, s.name
                 FROM subjects s
                 JOIN assignments a ON a.subject_id = s.id
                 WHERE a.teacher_id = ?
                 ORDER BY s.name, s.id",
            )
            .map_err(db_err)?;
        stmt.query_map([teacher_id], |r| {
            Ok(SubjectInfo {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)
    }

    fn classes_for_teacher(&self, teacher_id: i64) -> Result<Vec<ClassInfo>, CalcError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM classes WHERE teacher_id = ? ORDER BY name, id")
            .map_err(db_err)?;
        stmt.query_map([teacher_id], |r| {
            Ok(ClassInfo {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)
    }

    fn answers_for_questions(
        &self,
        family: TestFamily,
        question_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<AnswerRecord>>, CalcError> {
        let mut out: HashMap<i64, Vec<AnswerRecord>> =
            question_ids.iter().map(|id| (*id, Vec::new())).collect();
        for chunk in question_ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT id, result_id, question_id, is_correct, {}
                 FROM {}
                 WHERE question_id IN ({})
                 ORDER BY id",
                answer_detail_columns(family),
                families::tables(family).answers,
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(int_values(chunk)), |r| {
                    answer_from_row(family, r)
                })
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
                .map_err(db_err)?;
            for a in rows {
                out.entry(a.question_id).or_default().push(a);
            }
        }
        Ok(out)
    }

    fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, CalcError> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for chunk in user_ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT id, last_name, first_name FROM users WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(int_values(chunk)), |r| {
                    let last: String = r.get(1)?;
                    let first: String = r.get(2)?;
                    Ok((r.get::<_, i64>(0)?, format!("{}, {}", last, first)))
                })
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
                .map_err(db_err)?;
            out.extend(rows);
        }
        Ok(out)
    }

    fn students_by_ids(&self, student_ids: &[i64]) -> Result<HashMap<i64, Student>, CalcError> {
        let mut out = HashMap::with_capacity(student_ids.len());
        for chunk in student_ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT id, user_id, class_id FROM students WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(int_values(chunk)), |r| {
                    let s = student_from_row(r)?;
                    Ok((s.id, s))
                })
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
                .map_err(db_err)?;
            out.extend(rows);
        }
        Ok(out)
    }
}
