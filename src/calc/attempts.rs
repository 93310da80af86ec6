use crate::model::Attempt;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One test's attempts split by state.
#[derive(Debug, Clone, Default)]
pub struct AttemptPartition<'a> {
    pub completed: Vec<&'a Attempt>,
    pub in_progress: Vec<&'a Attempt>,
    /// Flagged completed but missing `completed_at`; counted nowhere.
    pub completed_without_timestamp: Vec<&'a Attempt>,
    pub completed_student_ids: BTreeSet<i64>,
    /// Students with an open attempt and no completed one. A student who
    /// finished once and then reopened the test stays in `completed_student_ids`
    /// only.
    pub in_progress_student_ids: BTreeSet<i64>,
}

impl AttemptPartition<'_> {
    pub fn completed_count(&self) -> usize {
        self.completed_student_ids.len()
    }

    /// Distinct students with an open attempt and no completed one. A student
    /// who finished and then reopened the test is counted as completed only,
    /// so this can be lower than the raw count of students with open attempts
    /// and `completed + in_progress` never double-counts a student.
    pub fn in_progress_count(&self) -> usize {
        self.in_progress_student_ids.len()
    }

    /// Clamped at zero: attempts by students outside the roster still count
    /// toward the completed/in-progress sets.
    pub fn not_started_count(&self, roster_size: usize) -> usize {
        roster_size
            .saturating_sub(self.completed_count())
            .saturating_sub(self.in_progress_count())
    }
}

pub fn classify(attempts: &[Attempt]) -> AttemptPartition<'_> {
    let mut out = AttemptPartition::default();
    for a in attempts {
        if a.is_finished() {
            out.completed.push(a);
            out.completed_student_ids.insert(a.student_id);
        } else if a.is_in_progress() {
            out.in_progress.push(a);
        } else {
            out.completed_without_timestamp.push(a);
        }
    }
    for a in &out.in_progress {
        if !out.completed_student_ids.contains(&a.student_id) {
            out.in_progress_student_ids.insert(a.student_id);
        }
    }
    out
}

pub fn group_by_student(attempts: &[Attempt]) -> BTreeMap<i64, Vec<&Attempt>> {
    let mut out: BTreeMap<i64, Vec<&Attempt>> = BTreeMap::new();
    for a in attempts {
        out.entry(a.student_id).or_default().push(a);
    }
    out
}

/// Ranks two completed attempts: higher percentage, then higher raw score,
/// then lower attempt id. The final key makes the pick independent of the
/// order rows arrive in.
fn best_order(a: &Attempt, b: &Attempt) -> Ordering {
    b.percentage
        .partial_cmp(&a.percentage)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.id.cmp(&b.id))
}

/// Best completed attempt among `attempts`.
pub fn best_attempt<'a, I>(attempts: I) -> Option<&'a Attempt>
where
    I: IntoIterator<Item = &'a Attempt>,
{
    attempts
        .into_iter()
        .filter(|a| a.is_finished())
        .min_by(|a, b| best_order(a, b))
}

/// Completed attempt with the latest `completed_at`; ties go to the higher
/// attempt number, then the higher id.
pub fn latest_attempt<'a, I>(attempts: I) -> Option<&'a Attempt>
where
    I: IntoIterator<Item = &'a Attempt>,
{
    attempts
        .into_iter()
        .filter(|a| a.is_finished())
        .max_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.attempt_number.cmp(&b.attempt_number))
                .then_with(|| a.id.cmp(&b.id))
        })
}
