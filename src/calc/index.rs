use super::attempts::classify;
use super::roster::merge_class_rosters;
use super::stats::compute_test_statistics;
use super::CalcError;
use crate::model::{AssignmentInfo, ClassInfo, Student, TestFamily, TestInfo};
use crate::source::AnalyticsSource;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFilters {
    pub subject_id: Option<i64>,
    pub class_id: Option<i64>,
    /// Restrict to these families; `None` means all four.
    pub families: Option<Vec<TestFamily>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryRow {
    pub family: TestFamily,
    pub test_id: i64,
    pub test_title: String,
    pub is_active: bool,
    pub assignment_id: Option<i64>,
    pub assignment_title: String,
    pub subject_id: Option<i64>,
    pub subject_name: String,
    pub class_names: Vec<String>,
    pub total_students: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub not_started_count: usize,
    pub completion_rate: f64,
    pub average_percentage: f64,
    pub average_grade: Option<i64>,
}

/// Per-request memo so tests sharing an assignment or class are only
/// looked up once.
#[derive(Default)]
struct Lookups {
    assignments: HashMap<i64, Option<AssignmentInfo>>,
    classes: HashMap<i64, Vec<ClassInfo>>,
    students: HashMap<i64, Vec<Student>>,
}

impl Lookups {
    fn assignment<S>(&mut self, source: &S, id: i64) -> Result<Option<AssignmentInfo>, CalcError>
    where
        S: AnalyticsSource + ?Sized,
    {
        if let Some(hit) = self.assignments.get(&id) {
            return Ok(hit.clone());
        }
        let found = source.find_assignment(id)?;
        self.assignments.insert(id, found.clone());
        Ok(found)
    }

    fn classes<S>(&mut self, source: &S, assignment_id: i64) -> Result<Vec<ClassInfo>, CalcError>
    where
        S: AnalyticsSource + ?Sized,
    {
        if let Some(hit) = self.classes.get(&assignment_id) {
            return Ok(hit.clone());
        }
        let found = source.classes_for_assignment(assignment_id)?;
        self.classes.insert(assignment_id, found.clone());
        Ok(found)
    }

    fn students<S>(&mut self, source: &S, class_id: i64) -> Result<Vec<Student>, CalcError>
    where
        S: AnalyticsSource + ?Sized,
    {
        if let Some(hit) = self.students.get(&class_id) {
            return Ok(hit.clone());
        }
        let found = source.students_for_class(class_id)?;
        self.students.insert(class_id, found.clone());
        Ok(found)
    }
}

struct Candidate {
    test: TestInfo,
    assignment: Option<AssignmentInfo>,
    classes: Vec<ClassInfo>,
}

fn passes_filters(candidate: &Candidate, filters: &IndexFilters) -> bool {
    let subject_ok = filters
        .subject_id
        .map(|id| {
            candidate
                .assignment
                .as_ref()
                .and_then(|a| a.subject_id)
                == Some(id)
        })
        .unwrap_or(true);
    let class_ok = filters
        .class_id
        .map(|id| candidate.classes.iter().any(|c| c.id == id))
        .unwrap_or(true);
    subject_ok && class_ok
}

/// One summary row per test the teacher owns, across all families.
///
/// Subject and class filters are applied before any attempts are read.
/// Rows are ordered by subject name, assignment title, then test title;
/// family and test id break remaining ties.
pub fn build_index<S>(
    source: &S,
    teacher_id: i64,
    filters: &IndexFilters,
) -> Result<Vec<ReportSummaryRow>, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let families: Vec<TestFamily> = filters
        .families
        .clone()
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| TestFamily::ALL.to_vec());

    let mut lookups = Lookups::default();
    let mut candidates = Vec::new();
    for family in families {
        for test in source.tests_for_teacher(family, teacher_id)? {
            let (assignment, classes) = match test.assignment_id {
                Some(id) => (lookups.assignment(source, id)?, lookups.classes(source, id)?),
                None => (None, Vec::new()),
            };
            let candidate = Candidate {
                test,
                assignment,
                classes,
            };
            if passes_filters(&candidate, filters) {
                candidates.push(candidate);
            }
        }
    }

    let mut rows = Vec::with_capacity(candidates.len());
    for c in candidates {
        let mut per_class = Vec::with_capacity(c.classes.len());
        for class in &c.classes {
            per_class.push((class.clone(), lookups.students(source, class.id)?));
        }
        let roster_ids: HashSet<i64> = merge_class_rosters(per_class)
            .iter()
            .map(|r| r.student.id)
            .collect();
        let attempts = source.attempts_for_test(c.test.key)?;
        let stats = compute_test_statistics(&roster_ids, &classify(&attempts));

        rows.push(ReportSummaryRow {
            family: c.test.key.family,
            test_id: c.test.key.id,
            test_title: c.test.title.clone(),
            is_active: c.test.is_active,
            assignment_id: c.test.assignment_id,
            assignment_title: c.assignment.as_ref().map(|a| a.title.clone()).unwrap_or_default(),
            subject_id: c.assignment.as_ref().and_then(|a| a.subject_id),
            subject_name: c
                .assignment
                .as_ref()
                .and_then(|a| a.subject_name.clone())
                .unwrap_or_default(),
            class_names: c.classes.iter().map(|cl| cl.name.clone()).collect(),
            total_students: stats.total_students,
            completed_count: stats.completed_count,
            in_progress_count: stats.in_progress_count,
            not_started_count: stats.not_started_count,
            completion_rate: stats.completion_rate,
            average_percentage: stats.average_percentage,
            average_grade: stats.average_grade,
        });
    }

    rows.sort_by(|a, b| {
        a.subject_name
            .cmp(&b.subject_name)
            .then_with(|| a.assignment_title.cmp(&b.assignment_title))
            .then_with(|| a.test_title.cmp(&b.test_title))
            .then_with(|| a.family.cmp(&b.family))
            .then_with(|| a.test_id.cmp(&b.test_id))
    });
    debug!(teacher_id, rows = rows.len(), "report index built");
    Ok(rows)
}
