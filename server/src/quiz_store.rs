//! Quiz content collaborator
//!
//! The coordinator only needs two things from quiz storage: turn a request
//! into a stored quiz, and fetch a stored quiz by id. `MemoryQuizStore`
//! keeps quizzes in memory and generates them with the deterministic mock
//! path; quiz files can be preloaded at startup.

use log::info;
use serde::Deserialize;
use shared::{Question, QuizId, QuizSnapshot, DEFAULT_QUESTION_COUNT};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizStoreError {
    #[error("topic is required")]
    MissingTopic,

    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {index} has correct index {correct_index} but only {options} options")]
    InvalidQuestion {
        index: usize,
        correct_index: usize,
        options: usize,
    },

    #[error("failed to read quiz file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse quiz file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters for generating a new quiz
#[derive(Debug, Clone, PartialEq)]
pub struct QuizRequest {
    pub topic: String,
    pub question_count: usize,
    pub time_limit_minutes: Option<u32>,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit_minutes: None,
        }
    }
}

pub trait QuizStore {
    /// Generates a quiz for the request and stores it
    fn generate_quiz(&mut self, request: &QuizRequest) -> Result<QuizId, QuizStoreError>;

    /// Stores an already built quiz
    fn insert_quiz(&mut self, quiz: QuizSnapshot) -> Result<QuizId, QuizStoreError>;

    fn get_quiz(&self, id: &QuizId) -> Option<QuizSnapshot>;
}

/// On-disk quiz file: either a single quiz or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum QuizFile {
    Many(Vec<QuizSnapshot>),
    One(QuizSnapshot),
}

#[derive(Default)]
pub struct MemoryQuizStore {
    quizzes: HashMap<QuizId, QuizSnapshot>,
    next_id: u64,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every quiz in a JSON file, returning the assigned ids in file order
    pub fn load_file(&mut self, path: &Path) -> Result<Vec<QuizId>, QuizStoreError> {
        let contents = std::fs::read_to_string(path)?;
        let quizzes = match serde_json::from_str::<QuizFile>(&contents)? {
            QuizFile::Many(quizzes) => quizzes,
            QuizFile::One(quiz) => vec![quiz],
        };

        let ids = quizzes
            .into_iter()
            .map(|quiz| self.insert_quiz(quiz))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} quizzes from {}", ids.len(), path.display());
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    fn next_quiz_id(&mut self) -> QuizId {
        self.next_id += 1;
        QuizId(format!("quiz-{}", self.next_id))
    }
}

impl QuizStore for MemoryQuizStore {
    fn generate_quiz(&mut self, request: &QuizRequest) -> Result<QuizId, QuizStoreError> {
        let quiz = mock_quiz(request)?;
        self.insert_quiz(quiz)
    }

    fn insert_quiz(&mut self, quiz: QuizSnapshot) -> Result<QuizId, QuizStoreError> {
        validate(&quiz)?;
        let id = self.next_quiz_id();
        info!(
            "Stored quiz {} \"{}\" ({} questions)",
            id,
            quiz.title,
            quiz.question_count()
        );
        self.quizzes.insert(id.clone(), quiz);
        Ok(id)
    }

    fn get_quiz(&self, id: &QuizId) -> Option<QuizSnapshot> {
        self.quizzes.get(id).cloned()
    }
}

/// Deterministic stand-in for model generated content
///
/// Every question has the first option correct so scripted players can
/// verify scoring.
pub fn mock_quiz(request: &QuizRequest) -> Result<QuizSnapshot, QuizStoreError> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(QuizStoreError::MissingTopic);
    }
    if request.question_count == 0 {
        return Err(QuizStoreError::NoQuestions);
    }

    let title = if topic.eq_ignore_ascii_case("test") {
        "Test Quiz".to_string()
    } else {
        format!("{} Quiz", topic)
    };

    let questions = (1..=request.question_count)
        .map(|i| Question {
            text: format!("Test Question {}?", i),
            options: ["Correct", "Wrong A", "Wrong B", "Wrong C"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            correct_index: 0,
            time_limit_seconds: None,
        })
        .collect();

    Ok(QuizSnapshot {
        title,
        questions,
        total_time_minutes: request.time_limit_minutes,
    })
}

fn validate(quiz: &QuizSnapshot) -> Result<(), QuizStoreError> {
    if quiz.questions.is_empty() {
        return Err(QuizStoreError::NoQuestions);
    }
    for (index, question) in quiz.questions.iter().enumerate() {
        if question.correct_index >= question.options.len() {
            return Err(QuizStoreError::InvalidQuestion {
                index,
                correct_index: question.correct_index,
                options: question.options.len(),
            });
        }
    }
    Ok(())
}
