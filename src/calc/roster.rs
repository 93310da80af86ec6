use super::CalcError;
use crate::model::{ClassInfo, Student};
use crate::source::AnalyticsSource;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// A student expected to take a test, with the class that put them there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student: Student,
    pub class_id: i64,
    pub class_name: String,
}

/// Students reachable through assignment -> classes -> students.
///
/// A test without an assignment, or an assignment without linked classes,
/// has an empty roster. There is no fallback to the teacher's other students.
pub fn resolve_roster<S>(source: &S, assignment_id: Option<i64>) -> Result<Vec<RosterEntry>, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let Some(assignment_id) = assignment_id else {
        return Ok(Vec::new());
    };
    let classes = source.classes_for_assignment(assignment_id)?;
    let mut per_class = Vec::with_capacity(classes.len());
    for class in classes {
        let students = source.students_for_class(class.id)?;
        per_class.push((class, students));
    }
    let roster = merge_class_rosters(per_class);
    debug!(assignment_id, roster_size = roster.len(), "roster resolved");
    Ok(roster)
}

/// Flattens per-class student lists, keeping the first occurrence of each
/// student id.
pub fn merge_class_rosters(per_class: Vec<(ClassInfo, Vec<Student>)>) -> Vec<RosterEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (class, students) in per_class {
        for student in students {
            if seen.insert(student.id) {
                out.push(RosterEntry {
                    student,
                    class_id: class.id,
                    class_name: class.name.clone(),
                });
            }
        }
    }
    out
}
