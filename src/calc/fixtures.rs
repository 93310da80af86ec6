//! In-memory `AnalyticsSource` used by the calc unit tests.

use super::CalcError;
use crate::model::{
    AnswerRecord, AssignmentInfo, Attempt, ClassInfo, QuestionRef, Student, SubjectInfo,
    TestFamily, TestInfo, TestKey,
};
use crate::source::AnalyticsSource;
use chrono::{DateTime, TimeZone, Utc};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

/// Completed attempt taking 600 seconds.
pub fn finished(id: i64, student_id: i64, score: f64, max_score: f64, grade: Option<i64>) -> Attempt {
    let started_at = ts(id * 1000);
    Attempt {
        id,
        test_id: 0,
        student_id,
        attempt_number: 1,
        started_at,
        completed_at: Some(started_at + chrono::Duration::seconds(600)),
        score,
        max_score,
        percentage: if max_score > 0.0 {
            100.0 * score / max_score
        } else {
            0.0
        },
        grade,
        completed: true,
    }
}

pub fn unfinished(id: i64, student_id: i64) -> Attempt {
    Attempt {
        id,
        test_id: 0,
        student_id,
        attempt_number: 1,
        started_at: ts(id * 1000),
        completed_at: None,
        score: 0.0,
        max_score: 0.0,
        percentage: 0.0,
        grade: None,
        completed: false,
    }
}

#[derive(Default)]
pub struct MemorySource {
    subjects: BTreeMap<i64, String>,
    assignments: BTreeMap<i64, AssignmentInfo>,
    classes: BTreeMap<i64, (ClassInfo, i64)>,
    links: Vec<(i64, i64)>,
    students: BTreeMap<i64, Student>,
    names: HashMap<i64, String>,
    tests: BTreeMap<(TestFamily, i64), TestInfo>,
    questions: HashMap<TestKey, Vec<QuestionRef>>,
    attempts: HashMap<TestKey, Vec<Attempt>>,
    answers: HashMap<(TestFamily, i64), Vec<AnswerRecord>>,
    pub fail_attempts: bool,
    pub attempt_reads: Cell<usize>,
    pub answer_reads: Cell<usize>,
}

impl MemorySource {
    pub fn add_subject(&mut self, id: i64, name: &str) {
        self.subjects.insert(id, name.to_string());
    }

    pub fn add_assignment(&mut self, id: i64, title: &str, subject_id: Option<i64>) {
        let subject_name = subject_id.and_then(|s| self.subjects.get(&s).cloned());
        self.assignments.insert(
            id,
            AssignmentInfo {
                id,
                title: title.to_string(),
                subject_id,
                subject_name,
            },
        );
    }

    pub fn add_class(&mut self, id: i64, name: &str, teacher_id: i64) {
        self.classes.insert(
            id,
            (
                ClassInfo {
                    id,
                    name: name.to_string(),
                },
                teacher_id,
            ),
        );
    }

    pub fn link_class(&mut self, assignment_id: i64, class_id: i64) {
        self.links.push((assignment_id, class_id));
    }

    pub fn add_student(&mut self, id: i64, user_id: i64, class_id: Option<i64>, name: &str) {
        self.students.insert(
            id,
            Student {
                id,
                user_id,
                class_id,
            },
        );
        self.names.insert(user_id, name.to_string());
    }

    pub fn add_test(
        &mut self,
        family: TestFamily,
        id: i64,
        title: &str,
        assignment_id: Option<i64>,
        teacher_id: i64,
    ) -> TestKey {
        let key = TestKey { family, id };
        self.tests.insert(
            (family, id),
            TestInfo {
                key,
                title: title.to_string(),
                assignment_id,
                teacher_id,
                max_attempts: 3,
                is_active: true,
                show_hints: false,
                show_answers: false,
            },
        );
        key
    }

    pub fn add_question(&mut self, key: TestKey, id: i64, order_index: i64, points: f64) {
        self.questions.entry(key).or_default().push(QuestionRef {
            id,
            test_id: key.id,
            order_index,
            points,
            prompt: format!("Question {}", order_index),
        });
    }

    pub fn add_attempt(&mut self, key: TestKey, mut attempt: Attempt) {
        attempt.test_id = key.id;
        self.attempts.entry(key).or_default().push(attempt);
    }

    pub fn add_answer(
        &mut self,
        family: TestFamily,
        question_id: i64,
        id: i64,
        attempt_id: i64,
        is_correct: bool,
        value: &str,
    ) {
        self.answers
            .entry((family, question_id))
            .or_default()
            .push(AnswerRecord {
                id,
                attempt_id,
                question_id,
                is_correct,
                submitted_value: value.to_string(),
            });
    }
}

impl AnalyticsSource for MemorySource {
    fn find_test(&self, key: TestKey) -> Result<Option<TestInfo>, CalcError> {
        Ok(self.tests.get(&(key.family, key.id)).cloned())
    }

    fn tests_for_teacher(
        &self,
        family: TestFamily,
        teacher_id: i64,
    ) -> Result<Vec<TestInfo>, CalcError> {
        Ok(self
            .tests
            .values()
            .filter(|t| t.key.family == family && t.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    fn find_assignment(&self, assignment_id: i64) -> Result<Option<AssignmentInfo>, CalcError> {
        Ok(self.assignments.get(&assignment_id).cloned())
    }

    fn classes_for_assignment(&self, assignment_id: i64) -> Result<Vec<ClassInfo>, CalcError> {
        let mut out: Vec<ClassInfo> = self
            .links
            .iter()
            .filter(|(a, _)| *a == assignment_id)
            .filter_map(|(_, c)| self.classes.get(c).map(|(info, _)| info.clone()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn students_for_class(&self, class_id: i64) -> Result<Vec<Student>, CalcError> {
        Ok(self
            .students
            .values()
            .filter(|s| s.class_id == Some(class_id))
            .cloned()
            .collect())
    }

    fn find_student(&self, student_id: i64) -> Result<Option<Student>, CalcError> {
        Ok(self.students.get(&student_id).cloned())
    }

    fn attempts_for_test(&self, key: TestKey) -> Result<Vec<Attempt>, CalcError> {
        self.attempt_reads.set(self.attempt_reads.get() + 1);
        if self.fail_attempts {
            return Err(CalcError::db("attempts table unavailable"));
        }
        Ok(self.attempts.get(&key).cloned().unwrap_or_default())
    }

    fn attempts_for_student_and_test(
        &self,
        student_id: i64,
        key: TestKey,
    ) -> Result<Vec<Attempt>, CalcError> {
        Ok(self
            .attempts_for_test(key)?
            .into_iter()
            .filter(|a| a.student_id == student_id)
            .collect())
    }

    fn questions_for_test(&self, key: TestKey) -> Result<Vec<QuestionRef>, CalcError> {
        let mut out = self.questions.get(&key).cloned().unwrap_or_default();
        out.sort_by_key(|q| (q.order_index, q.id));
        Ok(out)
    }

    fn answers_for_question(
        &self,
        family: TestFamily,
        question_id: i64,
    ) -> Result<Vec<AnswerRecord>, CalcError> {
        self.answer_reads.set(self.answer_reads.get() + 1);
        Ok(self
            .answers
            .get(&(family, question_id))
            .cloned()
            .unwrap_or_default())
    }

    fn display_name(&self, user_id: i64) -> Result<Option<String>, CalcError> {
        Ok(self.names.get(&user_id).cloned())
    }

    fn subjects_for_teacher(&self, teacher_id: i64) -> Result<Vec<SubjectInfo>, CalcError> {
        let mut ids: Vec<i64> = self
            .tests
            .values()
            .filter(|t| t.teacher_id == teacher_id)
            .filter_map(|t| t.assignment_id)
            .filter_map(|a| self.assignments.get(&a).and_then(|a| a.subject_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                self.subjects.get(&id).map(|name| SubjectInfo {
                    id,
                    name: name.clone(),
                })
            })
            .collect())
    }

    fn classes_for_teacher(&self, teacher_id: i64) -> Result<Vec<ClassInfo>, CalcError> {
        Ok(self
            .classes
            .values()
            .filter(|(_, t)| *t == teacher_id)
            .map(|(c, _)| c.clone())
            .collect())
    }
}
