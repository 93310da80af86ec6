use super::percent_of;
use crate::model::{AnswerRecord, QuestionRef};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDifficulty {
    pub question_id: i64,
    pub order_index: i64,
    pub prompt: String,
    pub points: f64,
    pub total_answers: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    pub success_rate: f64,
    pub is_most_difficult: bool,
    pub is_easiest: bool,
}

/// Per-question answer counts and success rate, in question order.
///
/// Only answered questions take part in flagging. Every question sitting on
/// the minimum rate is flagged most difficult and every one on the maximum is
/// flagged easiest, so a single question, or several tied ones, can carry
/// both flags.
pub fn analyze_questions(
    questions: &[QuestionRef],
    answers_by_question: &HashMap<i64, Vec<AnswerRecord>>,
) -> Vec<QuestionDifficulty> {
    let mut rows: Vec<QuestionDifficulty> = questions
        .iter()
        .map(|q| {
            let answers = answers_by_question
                .get(&q.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let total = answers.len();
            let correct = answers.iter().filter(|a| a.is_correct).count();
            QuestionDifficulty {
                question_id: q.id,
                order_index: q.order_index,
                prompt: q.prompt.clone(),
                points: q.points,
                total_answers: total,
                correct_answers: correct,
                incorrect_answers: total - correct,
                success_rate: percent_of(correct, total),
                is_most_difficult: false,
                is_easiest: false,
            }
        })
        .collect();

    let answered_rates = rows
        .iter()
        .filter(|r| r.total_answers > 0)
        .map(|r| r.success_rate);
    let min_rate = answered_rates.clone().reduce(f64::min);
    let max_rate = answered_rates.reduce(f64::max);

    if let (Some(min_rate), Some(max_rate)) = (min_rate, max_rate) {
        for r in rows.iter_mut().filter(|r| r.total_answers > 0) {
            r.is_most_difficult = r.success_rate == min_rate;
            r.is_easiest = r.success_rate == max_rate;
        }
    }
    rows
}
