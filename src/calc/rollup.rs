use super::attempts::{best_attempt, group_by_student, latest_attempt};
use super::roster::RosterEntry;
use super::round_off_1_decimal;
use crate::model::Attempt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub attempt_number: i64,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub grade: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl From<&Attempt> for AttemptResult {
    fn from(a: &Attempt) -> Self {
        Self {
            attempt_id: a.id,
            attempt_number: a.attempt_number,
            score: a.score,
            max_score: a.max_score,
            percentage: a.percentage,
            grade: a.grade,
            started_at: a.started_at,
            completed_at: a.completed_at,
            duration_seconds: a.positive_duration_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRollup {
    pub student_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub class_id: i64,
    pub class_name: String,
    pub attempts_used: usize,
    pub attempts_remaining: i64,
    pub has_completed: bool,
    pub is_in_progress: bool,
    pub best_result: Option<AttemptResult>,
    pub latest_result: Option<AttemptResult>,
    pub first_started_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub total_time_spent_seconds: f64,
}

pub fn display_name_or_default(names: &HashMap<i64, String>, student_id: i64, user_id: i64) -> String {
    names
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| format!("Student #{}", student_id))
}

/// One row per roster student, attempted or not. Attempts by students outside
/// the roster are ignored here. Rows are ordered by class name, then display
/// name, then student id.
pub fn build_student_rollups(
    roster: &[RosterEntry],
    attempts: &[Attempt],
    names_by_user: &HashMap<i64, String>,
    max_attempts: i64,
) -> Vec<StudentRollup> {
    let by_student = group_by_student(attempts);
    let mut rows: Vec<StudentRollup> = roster
        .iter()
        .map(|entry| {
            let student = &entry.student;
            let own: &[&Attempt] = by_student
                .get(&student.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let attempts_used = own.len();
            let total_time: f64 = own
                .iter()
                .filter(|a| a.is_finished())
                .filter_map(|a| a.positive_duration_seconds())
                .sum();
            let last_activity_at = own
                .iter()
                .map(|a| a.completed_at.unwrap_or(a.started_at))
                .max();
            StudentRollup {
                student_id: student.id,
                user_id: student.user_id,
                display_name: display_name_or_default(names_by_user, student.id, student.user_id),
                class_id: entry.class_id,
                class_name: entry.class_name.clone(),
                attempts_used,
                attempts_remaining: max_attempts.saturating_sub(attempts_used as i64).max(0),
                has_completed: own.iter().any(|a| a.is_finished()),
                is_in_progress: own.iter().any(|a| a.is_in_progress()),
                best_result: best_attempt(own.iter().copied()).map(AttemptResult::from),
                latest_result: latest_attempt(own.iter().copied()).map(AttemptResult::from),
                first_started_at: own.iter().map(|a| a.started_at).min(),
                last_activity_at,
                total_time_spent_seconds: round_off_1_decimal(total_time),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    rows
}
