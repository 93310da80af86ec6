use super::attempts::{best_attempt, classify, latest_attempt, AttemptPartition};
use super::difficulty::{analyze_questions, QuestionDifficulty};
use super::mistakes::{detect_mistakes, Attribution, QuestionMistakes};
use super::rollup::{build_student_rollups, display_name_or_default, AttemptResult, StudentRollup};
use super::roster::{resolve_roster, RosterEntry};
use super::stats::{compute_test_statistics, TestStatistics};
use super::{CalcError, ReportOptions};
use crate::model::{Attempt, TestInfo, TestKey};
use crate::source::AnalyticsSource;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Recoverable data problems found while building a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataWarning {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReport {
    pub difficulty: Vec<QuestionDifficulty>,
    pub mistakes: Vec<QuestionMistakes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub test: TestInfo,
    pub statistics: TestStatistics,
    pub off_roster_attempt_count: usize,
    pub questions: QuestionReport,
    pub students: Vec<StudentRollup>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttemptHistory {
    pub test: TestInfo,
    pub student_id: i64,
    pub display_name: String,
    pub on_roster: bool,
    pub attempts: Vec<AttemptResult>,
    pub best_attempt_id: Option<i64>,
    pub latest_attempt_id: Option<i64>,
}

/// Resolves the test and checks ownership. Nothing else is read before the
/// ownership check passes.
pub fn load_owned_test<S>(source: &S, teacher_id: i64, key: TestKey) -> Result<TestInfo, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let Some(test) = source.find_test(key)? else {
        return Err(CalcError::not_found(format!(
            "{} test {} not found",
            key.family.as_str(),
            key.id
        ))
        .with_details(json!({ "family": key.family, "testId": key.id })));
    };
    if test.teacher_id != teacher_id {
        warn!(
            family = key.family.as_str(),
            test_id = key.id,
            teacher_id,
            "report requested for a test owned by another teacher"
        );
        return Err(CalcError::access_denied("test belongs to another teacher")
            .with_details(json!({ "family": key.family, "testId": key.id })));
    }
    Ok(test)
}

fn collect_warnings(
    partition: &AttemptPartition<'_>,
    attempts: &[Attempt],
    roster_ids: &HashSet<i64>,
) -> (Vec<DataWarning>, usize) {
    let mut warnings = Vec::new();
    for a in &partition.completed_without_timestamp {
        warn!(attempt_id = a.id, student_id = a.student_id, "completed attempt has no completion time");
        warnings.push(DataWarning {
            code: "completed_without_timestamp".into(),
            message: "attempt is flagged completed but has no completion time".into(),
            attempt_id: Some(a.id),
            student_id: Some(a.student_id),
        });
    }
    let mut off_roster = 0;
    for a in attempts {
        if roster_ids.contains(&a.student_id) {
            continue;
        }
        off_roster += 1;
        warn!(attempt_id = a.id, student_id = a.student_id, "attempt by a student outside the roster");
        warnings.push(DataWarning {
            code: "off_roster_attempt".into(),
            message: "attempt belongs to a student who is not on the test roster".into(),
            attempt_id: Some(a.id),
            student_id: Some(a.student_id),
        });
    }
    (warnings, off_roster)
}

/// Display names for every student touched by the roster or the attempts,
/// keyed by student id.
fn student_names<S>(
    source: &S,
    roster: &[RosterEntry],
    attempts: &[Attempt],
) -> Result<(HashMap<i64, String>, HashMap<i64, String>), CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let mut user_by_student: HashMap<i64, i64> = roster
        .iter()
        .map(|r| (r.student.id, r.student.user_id))
        .collect();
    let missing: Vec<i64> = attempts
        .iter()
        .map(|a| a.student_id)
        .filter(|id| !user_by_student.contains_key(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        for (id, s) in source.students_by_ids(&missing)? {
            user_by_student.insert(id, s.user_id);
        }
    }

    let user_ids: Vec<i64> = user_by_student
        .values()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let names_by_user = source.display_names(&user_ids)?;
    let names_by_student = user_by_student
        .iter()
        .map(|(student_id, user_id)| {
            (
                *student_id,
                display_name_or_default(&names_by_user, *student_id, *user_id),
            )
        })
        .collect();
    Ok((names_by_user, names_by_student))
}

fn question_report<S>(
    source: &S,
    key: TestKey,
    attempts: &[Attempt],
    names_by_student: &HashMap<i64, String>,
    options: &ReportOptions,
) -> Result<QuestionReport, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let questions = source.questions_for_test(key)?;
    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let answers_by_question = source.answers_for_questions(key.family, &question_ids)?;

    let student_by_attempt: HashMap<i64, i64> =
        attempts.iter().map(|a| (a.id, a.student_id)).collect();
    let attribution = Attribution {
        student_by_attempt: &student_by_attempt,
        name_by_student: names_by_student,
    };

    let difficulty = analyze_questions(&questions, &answers_by_question);
    let mistakes = questions
        .iter()
        .map(|q| {
            let answers = answers_by_question
                .get(&q.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            detect_mistakes(q, answers, &attribution, options.top_mistakes)
        })
        .collect();
    Ok(QuestionReport {
        difficulty,
        mistakes,
    })
}

/// Full teacher-facing report for one test.
pub fn build_report<S>(
    source: &S,
    teacher_id: i64,
    key: TestKey,
    options: &ReportOptions,
) -> Result<TestReport, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let test = load_owned_test(source, teacher_id, key)?;
    let roster = resolve_roster(source, test.assignment_id)?;
    let attempts = source.attempts_for_test(key)?;
    let partition = classify(&attempts);

    let roster_ids: HashSet<i64> = roster.iter().map(|r| r.student.id).collect();
    let (warnings, off_roster_attempt_count) = collect_warnings(&partition, &attempts, &roster_ids);
    let statistics = compute_test_statistics(&roster_ids, &partition);

    let (names_by_user, names_by_student) = student_names(source, &roster, &attempts)?;
    let students = build_student_rollups(&roster, &attempts, &names_by_user, test.max_attempts);
    let questions = question_report(source, key, &attempts, &names_by_student, options)?;

    debug!(
        family = key.family.as_str(),
        test_id = key.id,
        roster = roster.len(),
        attempts = attempts.len(),
        questions = questions.difficulty.len(),
        "test report built"
    );

    Ok(TestReport {
        test,
        statistics,
        off_roster_attempt_count,
        questions,
        students,
        warnings,
    })
}

/// Difficulty and mistake clusters only.
pub fn build_question_report<S>(
    source: &S,
    teacher_id: i64,
    key: TestKey,
    options: &ReportOptions,
) -> Result<QuestionReport, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let test = load_owned_test(source, teacher_id, key)?;
    let roster = resolve_roster(source, test.assignment_id)?;
    let attempts = source.attempts_for_test(key)?;
    let (_, names_by_student) = student_names(source, &roster, &attempts)?;
    question_report(source, key, &attempts, &names_by_student, options)
}

/// Student rollup rows only.
pub fn build_student_report<S>(
    source: &S,
    teacher_id: i64,
    key: TestKey,
) -> Result<Vec<StudentRollup>, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let test = load_owned_test(source, teacher_id, key)?;
    let roster = resolve_roster(source, test.assignment_id)?;
    let attempts = source.attempts_for_test(key)?;
    let (names_by_user, _) = student_names(source, &roster, &attempts)?;
    Ok(build_student_rollups(
        &roster,
        &attempts,
        &names_by_user,
        test.max_attempts,
    ))
}

/// Every attempt one student made at a test, ordered by attempt number.
pub fn build_student_history<S>(
    source: &S,
    teacher_id: i64,
    key: TestKey,
    student_id: i64,
) -> Result<StudentAttemptHistory, CalcError>
where
    S: AnalyticsSource + ?Sized,
{
    let test = load_owned_test(source, teacher_id, key)?;
    let Some(student) = source.find_student(student_id)? else {
        return Err(CalcError::not_found(format!("student {} not found", student_id))
            .with_details(json!({ "studentId": student_id })));
    };
    let roster = resolve_roster(source, test.assignment_id)?;
    let on_roster = roster.iter().any(|r| r.student.id == student_id);

    let mut attempts = source.attempts_for_student_and_test(student_id, key)?;
    attempts.sort_by_key(|a| (a.attempt_number, a.id));
    let names = source.display_names(&[student.user_id])?;

    Ok(StudentAttemptHistory {
        student_id,
        display_name: display_name_or_default(&names, student.id, student.user_id),
        on_roster,
        best_attempt_id: best_attempt(&attempts).map(|a| a.id),
        latest_attempt_id: latest_attempt(&attempts).map(|a| a.id),
        attempts: attempts.iter().map(AttemptResult::from).collect(),
        test,
    })
}
