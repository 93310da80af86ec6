use crate::calc::CalcError;
use crate::model::{
    AnswerRecord, AssignmentInfo, Attempt, ClassInfo, QuestionRef, Student, SubjectInfo,
    TestFamily, TestInfo, TestKey,
};
use std::collections::HashMap;

/// Read-only lookups the analytics engine needs from the surrounding
/// application. Implementations must not be mutated by the engine and are
/// free to fail; errors are propagated unchanged.
///
/// The plural lookups have per-id defaults. Storage-backed
/// implementations should override them with a single fetch-all-then-index
/// query.
pub trait AnalyticsSource {
    fn find_test(&self, key: TestKey) -> Result<Option<TestInfo>, CalcError>;

    fn tests_for_teacher(
        &self,
        family: TestFamily,
        teacher_id: i64,
    ) -> Result<Vec<TestInfo>, CalcError>;

    fn find_assignment(&self, assignment_id: i64) -> Result<Option<AssignmentInfo>, CalcError>;

    /// Classes the assignment is linked to, ordered by class name then id.
    fn classes_for_assignment(&self, assignment_id: i64) -> Result<Vec<ClassInfo>, CalcError>;

    /// Students of one class, ordered by student id.
    fn students_for_class(&self, class_id: i64) -> Result<Vec<Student>, CalcError>;

    fn find_student(&self, student_id: i64) -> Result<Option<Student>, CalcError>;

    fn attempts_for_test(&self, key: TestKey) -> Result<Vec<Attempt>, CalcError>;

    fn attempts_for_student_and_test(
        &self,
        student_id: i64,
        key: TestKey,
    ) -> Result<Vec<Attempt>, CalcError>;

    /// Questions ordered by order index.
    fn questions_for_test(&self, key: TestKey) -> Result<Vec<QuestionRef>, CalcError>;

    fn answers_for_question(
        &self,
        family: TestFamily,
        question_id: i64,
    ) -> Result<Vec<AnswerRecord>, CalcError>;

    fn display_name(&self, user_id: i64) -> Result<Option<String>, CalcError>;

    fn subjects_for_teacher(&self, teacher_id: i64) -> Result<Vec<SubjectInfo>, CalcError>;

    fn classes_for_teacher(&self, teacher_id: i64) -> Result<Vec<ClassInfo>, CalcError>;

    fn answers_for_questions(
        &self,
        family: TestFamily,
        question_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<AnswerRecord>>, CalcError> {
        let mut out = HashMap::new();
        for id in question_ids {
            out.insert(*id, self.answers_for_question(family, *id)?);
        }
        Ok(out)
    }

    fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, CalcError> {
        let mut out = HashMap::new();
        for id in user_ids {
            if let Some(name) = self.display_name(*id)? {
                out.insert(*id, name);
            }
        }
        Ok(out)
    }

    fn students_by_ids(&self, student_ids: &[i64]) -> Result<HashMap<i64, Student>, CalcError> {
        let mut out = HashMap::new();
        for id in student_ids {
            if let Some(s) = self.find_student(*id)? {
                out.insert(*id, s);
            }
        }
        Ok(out)
    }
}
