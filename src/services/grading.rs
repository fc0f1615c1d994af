use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::time::format_optional;
use crate::db::models::QuestionOption;
use crate::repositories::attempts::AttemptSummaryRow;
use crate::schemas::quiz::{CategoryStats, RecentAttempt, StudentProgress, SubmittedAnswer};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedSubmission {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) score: f64,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of correct answers rounded to two decimals; zero for an empty quiz.
pub(crate) fn score_percent(correct: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(f64::from(correct) / f64::from(total) * 100.0)
}

/// Grades a whole batch against the assigned question set.
///
/// The batch is rejected as a unit when an entry names a question outside
/// `assigned`, repeats a question, or selects an option of another question.
/// Assigned questions without an entry count as incorrect and produce no answer.
pub(crate) fn grade_submission(
    assigned: &[String],
    options: &[QuestionOption],
    answers: &[SubmittedAnswer],
) -> Result<GradedSubmission, String> {
    let assigned_set: HashSet<&str> = assigned.iter().map(String::as_str).collect();
    let options_by_id: HashMap<&str, &QuestionOption> =
        options.iter().map(|option| (option.id.as_str(), option)).collect();

    let mut seen = HashSet::new();
    let mut graded = Vec::with_capacity(answers.len());

    for answer in answers {
        let question_id = answer.question_id.as_str();
        if !assigned_set.contains(question_id) {
            return Err(format!("question {question_id} is not part of this attempt"));
        }
        if !seen.insert(question_id) {
            return Err(format!("question {question_id} is answered more than once"));
        }

        let is_correct = match answer.selected_option_id.as_deref() {
            None => false,
            Some(option_id) => {
                let option = options_by_id
                    .get(option_id)
                    .filter(|option| option.question_id == question_id)
                    .ok_or_else(|| {
                        format!("option {option_id} does not belong to question {question_id}")
                    })?;
                option.is_correct
            }
        };

        graded.push(GradedAnswer {
            question_id: answer.question_id.clone(),
            selected_option_id: answer.selected_option_id.clone(),
            is_correct,
        });
    }

    let total_questions = assigned.len() as i32;
    let correct_answers = graded.iter().filter(|answer| answer.is_correct).count() as i32;

    Ok(GradedSubmission {
        answers: graded,
        correct_answers,
        total_questions,
        score: score_percent(correct_answers, total_questions),
    })
}

/// Rolls completed attempts (newest first) up into the progress view.
pub(crate) fn summarize_progress(
    completed: &[AttemptSummaryRow],
    recent_limit: usize,
) -> StudentProgress {
    let mut per_category: BTreeMap<String, (i64, f64, f64)> = BTreeMap::new();
    let mut total = 0.0;
    let mut best = 0.0_f64;

    for attempt in completed {
        let score = attempt.score.unwrap_or(0.0);
        total += score;
        best = best.max(score);

        let entry = per_category.entry(attempt.category_name.clone()).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += score;
        entry.2 = entry.2.max(score);
    }

    let count = completed.len() as i64;
    let average = if count == 0 { 0.0 } else { round2(total / count as f64) };

    let category_stats = per_category
        .into_iter()
        .map(|(name, (attempts, sum, best))| {
            let stats = CategoryStats {
                attempts,
                average_score: round2(sum / attempts as f64),
                best_score: best,
            };
            (name, stats)
        })
        .collect();

    let recent_attempts = completed
        .iter()
        .take(recent_limit)
        .map(|attempt| RecentAttempt {
            id: attempt.id.clone(),
            category_id: attempt.category_id.clone(),
            category_name: attempt.category_name.clone(),
            difficulty_id: attempt.difficulty_id.clone(),
            difficulty_name: attempt.difficulty_name.clone(),
            correct_answers: attempt.correct_answers,
            total_questions: attempt.total_questions,
            score: attempt.score.unwrap_or(0.0),
            completed_at: format_optional(attempt.completed_at),
        })
        .collect();

    StudentProgress {
        total_attempts: count,
        average_score: average,
        best_score: best,
        category_stats,
        recent_attempts,
    }
}
