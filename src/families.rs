//! Per-family table layout and the row adapters that turn family-specific
//! questions and answers into the neutral `QuestionRef`/`AnswerRecord`.
//! Nothing outside this module looks at family-specific columns.

use crate::model::{AnswerRecord, QuestionRef, TestFamily};
use rusqlite::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyTables {
    pub tests: &'static str,
    pub questions: &'static str,
    pub results: &'static str,
    pub answers: &'static str,
}

pub fn tables(family: TestFamily) -> FamilyTables {
    match family {
        TestFamily::Spelling => FamilyTables {
            tests: "spelling_tests",
            questions: "spelling_questions",
            results: "spelling_results",
            answers: "spelling_answers",
        },
        TestFamily::Punctuation => FamilyTables {
            tests: "punctuation_tests",
            questions: "punctuation_questions",
            results: "punctuation_results",
            answers: "punctuation_answers",
        },
        TestFamily::Stress => FamilyTables {
            tests: "stress_tests",
            questions: "stress_questions",
            results: "stress_results",
            answers: "stress_answers",
        },
        TestFamily::Generic => FamilyTables {
            tests: "generic_tests",
            questions: "generic_questions",
            results: "generic_results",
            answers: "generic_answers",
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionDetail {
    Spelling {
        word_with_gap: String,
        correct_letter: String,
    },
    Punctuation {
        sentence: String,
        correct_positions: String,
    },
    Stress {
        word: String,
        stress_position: i64,
    },
    Generic {
        question_text: String,
        question_type: String,
    },
}

impl QuestionDetail {
    pub fn prompt(&self) -> &str {
        match self {
            QuestionDetail::Spelling { word_with_gap, .. } => word_with_gap,
            QuestionDetail::Punctuation { sentence, .. } => sentence,
            QuestionDetail::Stress { word, .. } => word,
            QuestionDetail::Generic { question_text, .. } => question_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerDetail {
    Spelling {
        chosen_letter: String,
    },
    Punctuation {
        chosen_positions: String,
    },
    Stress {
        chosen_position: Option<i64>,
    },
    Generic {
        selected_option: Option<String>,
        text_answer: Option<String>,
    },
}

impl AnswerDetail {
    /// The literal value the student submitted, as used for mistake
    /// clustering. No trimming or case folding.
    pub fn submitted_value(&self) -> String {
        match self {
            AnswerDetail::Spelling { chosen_letter } => chosen_letter.clone(),
            AnswerDetail::Punctuation { chosen_positions } => chosen_positions.clone(),
            AnswerDetail::Stress { chosen_position } => chosen_position
                .map(|p| p.to_string())
                .unwrap_or_default(),
            AnswerDetail::Generic {
                selected_option,
                text_answer,
            } => match (text_answer.as_deref(), selected_option.as_deref()) {
                (Some(text), _) if !text.is_empty() => text.to_string(),
                (_, Some(option)) => option.to_string(),
                _ => String::new(),
            },
        }
    }
}

/// Family-specific question columns, selected after the shared
/// `id, test_id, order_index, points` prefix.
pub fn question_detail_columns(family: TestFamily) -> &'static str {
    match family {
        TestFamily::Spelling => "word_with_gap, correct_letter",
        TestFamily::Punctuation => "sentence, correct_positions",
        TestFamily::Stress => "word, stress_position",
        TestFamily::Generic => "question_text, question_type",
    }
}

/// Family-specific answer columns, selected after the shared
/// `id, result_id, question_id, is_correct` prefix.
pub fn answer_detail_columns(family: TestFamily) -> &'static str {
    match family {
        TestFamily::Spelling => "chosen_letter",
        TestFamily::Punctuation => "chosen_positions",
        TestFamily::Stress => "chosen_position",
        TestFamily::Generic => "selected_option, text_answer",
    }
}

fn read_question_detail(family: TestFamily, r: &Row<'_>, at: usize) -> rusqlite::Result<QuestionDetail> {
    Ok(match family {
        TestFamily::Spelling => QuestionDetail::Spelling {
            word_with_gap: r.get(at)?,
            correct_letter: r.get(at + 1)?,
        },
        TestFamily::Punctuation => QuestionDetail::Punctuation {
            sentence: r.get(at)?,
            correct_positions: r.get(at + 1)?,
        },
        TestFamily::Stress => QuestionDetail::Stress {
            word: r.get(at)?,
            stress_position: r.get(at + 1)?,
        },
        TestFamily::Generic => QuestionDetail::Generic {
            question_text: r.get(at)?,
            question_type: r.get(at + 1)?,
        },
    })
}

fn read_answer_detail(family: TestFamily, r: &Row<'_>, at: usize) -> rusqlite::Result<AnswerDetail> {
    Ok(match family {
        TestFamily::Spelling => AnswerDetail::Spelling {
            chosen_letter: r.get::<_, Option<String>>(at)?.unwrap_or_default(),
        },
        TestFamily::Punctuation => AnswerDetail::Punctuation {
            chosen_positions: r.get::<_, Option<String>>(at)?.unwrap_or_default(),
        },
        TestFamily::Stress => AnswerDetail::Stress {
            chosen_position: r.get(at)?,
        },
        TestFamily::Generic => AnswerDetail::Generic {
            selected_option: r.get(at)?,
            text_answer: r.get(at + 1)?,
        },
    })
}

/// Maps a `SELECT id, test_id, order_index, points, <detail columns>` row.
pub fn question_from_row(family: TestFamily, r: &Row<'_>) -> rusqlite::Result<QuestionRef> {
    let detail = read_question_detail(family, r, 4)?;
    Ok(QuestionRef {
        id: r.get(0)?,
        test_id: r.get(1)?,
        order_index: r.get(2)?,
        points: r.get::<_, Option<f64>>(3)?.unwrap_or(1.0),
        prompt: detail.prompt().to_string(),
    })
}

/// Maps a `SELECT id, result_id, question_id, is_correct, <detail columns>` row.
pub fn answer_from_row(family: TestFamily, r: &Row<'_>) -> rusqlite::Result<AnswerRecord> {
    let detail = read_answer_detail(family, r, 4)?;
    Ok(AnswerRecord {
        id: r.get(0)?,
        attempt_id: r.get(1)?,
        question_id: r.get(2)?,
        is_correct: r.get::<_, i64>(3)? != 0,
        submitted_value: detail.submitted_value(),
    })
}

/// DDL for one family's four tables.
pub fn schema(family: TestFamily) -> Vec<String> {
    let t = tables(family);
    let (question_cols, answer_cols) = match family {
        TestFamily::Spelling => (
            "word_with_gap TEXT NOT NULL, correct_letter TEXT NOT NULL",
            "chosen_letter TEXT",
        ),
        TestFamily::Punctuation => (
            "sentence TEXT NOT NULL, correct_positions TEXT NOT NULL",
            "chosen_positions TEXT",
        ),
        TestFamily::Stress => (
            "word TEXT NOT NULL, stress_position INTEGER NOT NULL",
            "chosen_position INTEGER",
        ),
        TestFamily::Generic => (
            "question_text TEXT NOT NULL, question_type TEXT NOT NULL DEFAULT 'single'",
            "selected_option TEXT, text_answer TEXT",
        ),
    };
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {tests}(
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                assignment_id INTEGER,
                teacher_id INTEGER NOT NULL,
                max_attempts INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 1,
                show_hints INTEGER NOT NULL DEFAULT 0,
                show_answers INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(assignment_id) REFERENCES assignments(id)
            )",
            tests = t.tests
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {questions}(
                id INTEGER PRIMARY KEY,
                test_id INTEGER NOT NULL,
                order_index INTEGER NOT NULL DEFAULT 0,
                points REAL NOT NULL DEFAULT 1,
                {question_cols},
                FOREIGN KEY(test_id) REFERENCES {tests}(id)
            )",
            questions = t.questions,
            tests = t.tests,
            question_cols = question_cols
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {results}(
                id INTEGER PRIMARY KEY,
                test_id INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                attempt_number INTEGER NOT NULL DEFAULT 1,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                score REAL NOT NULL DEFAULT 0,
                max_score REAL NOT NULL DEFAULT 0,
                percentage REAL NOT NULL DEFAULT 0,
                grade INTEGER,
                is_completed INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(test_id) REFERENCES {tests}(id),
                FOREIGN KEY(student_id) REFERENCES students(id)
            )",
            results = t.results,
            tests = t.tests
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {answers}(
                id INTEGER PRIMARY KEY,
                result_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                is_correct INTEGER NOT NULL DEFAULT 0,
                {answer_cols},
                FOREIGN KEY(result_id) REFERENCES {results}(id),
                FOREIGN KEY(question_id) REFERENCES {questions}(id)
            )",
            answers = t.answers,
            results = t.results,
            questions = t.questions,
            answer_cols = answer_cols
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{tests}_teacher ON {tests}(teacher_id)",
            tests = t.tests
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{questions}_test ON {questions}(test_id, order_index)",
            questions = t.questions
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{results}_test ON {results}(test_id)",
            results = t.results
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{results}_student ON {results}(student_id, test_id)",
            results = t.results
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{answers}_question ON {answers}(question_id)",
            answers = t.answers
        ),
    ]
}
