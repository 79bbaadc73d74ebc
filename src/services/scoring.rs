use std::collections::HashMap;

use crate::models::domain::{Answer, Quiz};

/// Everything grading produces for one submission. Counts treat unanswered
/// questions as incorrect, so `correct_count + incorrect_count` always equals
/// the quiz's question count.
#[derive(Clone, Debug, PartialEq)]
pub struct GradingOutcome {
    /// Denormalized answer records in question display order. Only submitted
    /// answers appear here; unanswered questions contribute to the counts but
    /// have nothing to review.
    pub answers: Vec<Answer>,
    /// Percentage score, 0-100. Defined as 0 for a quiz with no questions.
    pub score: f64,
    pub passed: bool,
    pub correct_count: usize,
    pub incorrect_count: usize,
}

/// Pure, deterministic grading of validated selections against a quiz's
/// answer key. `selections` maps question id to the chosen option index;
/// callers must have already bounds-checked every entry.
pub fn grade_submission(quiz: &Quiz, selections: &HashMap<String, usize>) -> GradingOutcome {
    let mut questions: Vec<_> = quiz.questions.iter().collect();
    questions.sort_by_key(|q| q.order);

    let total_questions = questions.len();
    let mut correct_count = 0;
    let mut answers = Vec::with_capacity(selections.len());

    for question in questions {
        let Some(&selected) = selections.get(&question.id) else {
            continue;
        };

        let is_correct = selected == question.correct_index;
        if is_correct {
            correct_count += 1;
        }

        answers.push(Answer {
            question_id: question.id.clone(),
            selected,
            question_text: question.question_text.clone(),
            selected_answer: question.option_text(selected).unwrap_or_default().to_string(),
            correct_answer: question.correct_answer_text().to_string(),
            is_correct,
            explanation: question.explanation.clone(),
            order: question.order,
        });
    }

    let score = if total_questions == 0 {
        0.0
    } else {
        100.0 * correct_count as f64 / total_questions as f64
    };

    GradingOutcome {
        answers,
        score,
        passed: score >= quiz.passing_score,
        correct_count,
        incorrect_count: total_questions - correct_count,
    }
}
