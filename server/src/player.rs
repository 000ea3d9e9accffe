//! Per-player progress tracking
//!
//! A `PlayerRecord` holds everything the server knows about one participant
//! of a session: score, question pointer, completion and anti-cheat counters.
//! Records are owned by exactly one `Session` and only mutated through it.

use crate::client_manager::ConnectionId;
use shared::{PlayerId, PlayerView, Question, ViolationKind, POINTS_PER_CORRECT};

/// Result of a player pressing "next"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The player moved on to the question at this index
    Question(usize),
    /// The player just went past the last question
    Finished,
}

#[derive(Debug)]
pub struct PlayerRecord {
    /// Stable identity assigned by the session at join time
    pub id: PlayerId,
    /// Connection currently bound to this player, `None` while disconnected
    pub connection: Option<ConnectionId>,
    /// Secret the player presents to rebind a new connection
    pub resume_token: String,
    pub name: String,
    pub score: u32,
    pub current_question_index: usize,
    pub finished: bool,
    /// Graded outcome of the answer accepted for the current question
    pub current_answer: Option<bool>,
    pub violation_count: u32,
    pub last_violation_type: Option<ViolationKind>,
}

impl PlayerRecord {
    /// Creates a fresh record at the start of the quiz
    pub fn new(id: PlayerId, connection: ConnectionId, name: String, resume_token: String) -> Self {
        Self {
            id,
            connection: Some(connection),
            resume_token,
            name,
            score: 0,
            current_question_index: 0,
            finished: false,
            current_answer: None,
            violation_count: 0,
            last_violation_type: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether this record is bound to the given connection
    pub fn is_bound_to(&self, connection: ConnectionId) -> bool {
        self.connection == Some(connection)
    }

    /// Grades an answer to the player's current question
    ///
    /// Returns `None` when the answer is not accepted: the player is finished,
    /// or the answer targets a different question than the one the player is
    /// on. Accepted answers return whether they were correct; correct answers
    /// add `POINTS_PER_CORRECT`. Only the first answer to a question is graded;
    /// repeats get the recorded outcome back and leave the score alone.
    pub fn answer(
        &mut self,
        question: &Question,
        answer_index: usize,
        question_index: Option<usize>,
    ) -> Option<bool> {
        if self.finished {
            return None;
        }
        if question_index.is_some_and(|index| index != self.current_question_index) {
            return None;
        }
        if let Some(is_correct) = self.current_answer {
            return Some(is_correct);
        }

        let is_correct = question.correct_index == answer_index;
        if is_correct {
            self.score += POINTS_PER_CORRECT;
        }
        self.current_answer = Some(is_correct);
        Some(is_correct)
    }

    /// Moves the question pointer forward by one
    ///
    /// `total` is the number of questions in the quiz. The pointer never moves
    /// past `total`; reaching it marks the player finished. Returns `None` if
    /// the player was already finished.
    pub fn advance(&mut self, total: usize) -> Option<Advance> {
        if self.finished {
            return None;
        }

        self.current_question_index = (self.current_question_index + 1).min(total);
        self.current_answer = None;

        if self.current_question_index < total {
            Some(Advance::Question(self.current_question_index))
        } else {
            self.finished = true;
            Some(Advance::Finished)
        }
    }

    pub fn record_violation(&mut self, kind: ViolationKind) {
        self.violation_count += 1;
        self.last_violation_type = Some(kind);
    }

    /// Snapshot of this record for the host dashboard
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            score: self.score,
            current_question_index: self.current_question_index,
            finished: self.finished,
            violation_count: self.violation_count,
            last_violation_type: self.last_violation_type.clone(),
            connected: self.is_connected(),
        }
    }
}
