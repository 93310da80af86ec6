use super::percent_of;
use crate::model::{AnswerRecord, QuestionRef};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeCluster {
    pub submitted_value: String,
    pub count: usize,
    pub percentage: f64,
    pub student_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMistakes {
    pub question_id: i64,
    pub order_index: i64,
    pub prompt: String,
    pub incorrect_answers: usize,
    pub common_mistakes: Vec<MistakeCluster>,
}

/// Who answered what: attempt id -> student id, student id -> display name.
pub struct Attribution<'a> {
    pub student_by_attempt: &'a HashMap<i64, i64>,
    pub name_by_student: &'a HashMap<i64, String>,
}

impl Attribution<'_> {
    fn student_name(&self, student_id: i64) -> String {
        self.name_by_student
            .get(&student_id)
            .cloned()
            .unwrap_or_else(|| format!("Student #{}", student_id))
    }
}

struct Group<'a> {
    value: &'a str,
    count: usize,
    students: BTreeSet<i64>,
}

/// Clusters the incorrect answers of one question by their literal submitted
/// value. Values are compared exactly as submitted. Clusters are ranked by
/// size, ties in ordinal order of the value, and cut to `top_n`.
pub fn detect_mistakes(
    question: &QuestionRef,
    answers: &[AnswerRecord],
    attribution: &Attribution<'_>,
    top_n: usize,
) -> QuestionMistakes {
    let incorrect: Vec<&AnswerRecord> = answers.iter().filter(|a| !a.is_correct).collect();
    let total_incorrect = incorrect.len();

    let mut groups: HashMap<&str, Group<'_>> = HashMap::new();
    for a in incorrect.iter().copied() {
        let g = groups
            .entry(a.submitted_value.as_str())
            .or_insert_with(|| Group {
                value: a.submitted_value.as_str(),
                count: 0,
                students: BTreeSet::new(),
            });
        g.count += 1;
        if let Some(student_id) = attribution.student_by_attempt.get(&a.attempt_id) {
            g.students.insert(*student_id);
        }
    }

    let mut ranked: Vec<Group<'_>> = groups.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(b.value)));
    ranked.truncate(top_n);

    let common_mistakes = ranked
        .into_iter()
        .map(|g| {
            let mut student_names: Vec<String> = g
                .students
                .iter()
                .map(|id| attribution.student_name(*id))
                .collect();
            student_names.sort();
            MistakeCluster {
                submitted_value: g.value.to_string(),
                count: g.count,
                percentage: percent_of(g.count, total_incorrect),
                student_names,
            }
        })
        .collect();

    QuestionMistakes {
        question_id: question.id,
        order_index: question.order_index,
        prompt: question.prompt.clone(),
        incorrect_answers: total_incorrect,
        common_mistakes,
    }
}
