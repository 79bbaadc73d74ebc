pub mod attempt_result;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod timestamps;

pub use attempt_result::{AiFeedback, AttemptResult, Course, QuestionReview};
pub use quiz::{Quiz, QuizStatus};
pub use quiz_attempt::{Answer, AttemptStatus, QuizAttempt};
pub use quiz_question::{QuizQuestion, QuizQuestionType};
