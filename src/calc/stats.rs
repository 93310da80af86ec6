use super::attempts::AttemptPartition;
use super::{percent_of, round_off_1_decimal};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Grade labels in display order. Anything at or below 2 lands in "2".
pub const GRADE_LABELS: [&str; 4] = ["5", "4", "3", "2"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatistics {
    pub total_students: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub not_started_count: usize,
    pub completion_rate: f64,
    pub average_score: f64,
    pub average_percentage: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub max_score: f64,
    pub average_grade: Option<i64>,
    pub first_completion_at: Option<DateTime<Utc>>,
    pub last_completion_at: Option<DateTime<Utc>>,
    pub average_completion_seconds: Option<f64>,
    pub grade_distribution: Vec<GradeBucket>,
}

fn grade_label(grade: i64) -> &'static str {
    match grade {
        g if g >= 5 => "5",
        4 => "4",
        3 => "3",
        _ => "2",
    }
}

pub fn grade_distribution<I>(grades: I) -> Vec<GradeBucket>
where
    I: IntoIterator<Item = i64>,
{
    let mut counts = [0_usize; 4];
    for g in grades {
        let label = grade_label(g);
        if let Some(pos) = GRADE_LABELS.iter().position(|l| *l == label) {
            counts[pos] += 1;
        }
    }
    GRADE_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| GradeBucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / (values.len() as f64))
    }
}

/// Test-level funnel and score summary. Score figures only look at
/// completed attempts; an empty set gives zeros, never NaN.
///
/// `completion_rate` only counts completers on the roster, so it stays
/// within 0..=100. `completed_count` keeps off-roster completers.
pub fn compute_test_statistics(roster_ids: &HashSet<i64>, partition: &AttemptPartition<'_>) -> TestStatistics {
    let roster_size = roster_ids.len();
    let completed = &partition.completed;
    let completed_on_roster = partition
        .completed_student_ids
        .iter()
        .filter(|id| roster_ids.contains(id))
        .count();

    let scores: Vec<f64> = completed.iter().map(|a| a.score).collect();
    let percentages: Vec<f64> = completed.iter().map(|a| a.percentage).collect();
    let grades: Vec<i64> = completed.iter().filter_map(|a| a.grade).collect();
    let durations: Vec<f64> = completed
        .iter()
        .filter_map(|a| a.positive_duration_seconds())
        .collect();

    let highest_score = scores.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |m| m.max(v)))
    });
    let lowest_score = scores.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |m| m.min(v)))
    });
    let max_score = completed
        .iter()
        .map(|a| a.max_score)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    let average_grade = if grades.is_empty() {
        None
    } else {
        let sum: i64 = grades.iter().sum();
        Some(((sum as f64) / (grades.len() as f64)).round() as i64)
    };

    let completion_times = completed.iter().filter_map(|a| a.completed_at);

    TestStatistics {
        total_students: roster_size,
        completed_count: partition.completed_count(),
        in_progress_count: partition.in_progress_count(),
        not_started_count: partition.not_started_count(roster_size),
        completion_rate: percent_of(completed_on_roster, roster_size),
        average_score: mean(&scores).map(round_off_1_decimal).unwrap_or(0.0),
        average_percentage: mean(&percentages).map(round_off_1_decimal).unwrap_or(0.0),
        highest_score: highest_score.unwrap_or(0.0),
        lowest_score: lowest_score.unwrap_or(0.0),
        max_score: max_score.unwrap_or(0.0),
        average_grade,
        first_completion_at: completion_times.clone().min(),
        last_completion_at: completion_times.max(),
        average_completion_seconds: mean(&durations).map(round_off_1_decimal),
        grade_distribution: grade_distribution(grades),
    }
}
