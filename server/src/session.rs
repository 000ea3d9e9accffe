//! State machine for one hosted quiz game.
//!
//! A session starts in `Lobby`, accepting joins, and moves to `Active` when
//! its host starts it. Players then progress through the quiz at their own
//! pace; there is no session-wide question pointer.

use crate::client_manager::ConnectionId;
use crate::error::CoordinatorError;
use crate::player::{Advance, PlayerRecord};
use log::info;
use shared::{JoinCode, PlayerId, PlayerView, QuizSnapshot, ViolationKind, ViolationNotice};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Lobby,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_index: usize,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextOutcome {
    pub advance: Advance,
    pub score: u32,
}

#[derive(Debug)]
pub struct Session {
    code: JoinCode,
    host: ConnectionId,
    quiz: QuizSnapshot,
    status: SessionStatus,
    players: Vec<PlayerRecord>,
    next_player_id: u32,
    last_activity: Instant,
}

impl Session {
    pub fn new(code: JoinCode, host: ConnectionId, quiz: QuizSnapshot, now: Instant) -> Self {
        Self {
            code,
            host,
            quiz,
            status: SessionStatus::Lobby,
            players: Vec::new(),
            next_player_id: 1,
            last_activity: now,
        }
    }

    pub fn code(&self) -> &JoinCode {
        &self.code
    }

    pub fn host(&self) -> ConnectionId {
        self.host
    }

    pub fn is_host(&self, connection: ConnectionId) -> bool {
        self.host == connection
    }

    pub fn quiz(&self) -> &QuizSnapshot {
        &self.quiz
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn player(&self, connection: ConnectionId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.is_bound_to(connection))
    }

    fn player_mut(&mut self, connection: ConnectionId) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|p| p.is_bound_to(connection))
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    /// Adds a player to the lobby.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        name: String,
        resume_token: String,
    ) -> Result<PlayerId, CoordinatorError> {
        if self.status != SessionStatus::Lobby {
            return Err(CoordinatorError::JoinUnavailable);
        }
        if self.player(connection).is_some() {
            return Err(CoordinatorError::AlreadyJoined);
        }

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        info!("Player {} ({}) joined session {}", id, name, self.code);
        self.players
            .push(PlayerRecord::new(id, connection, name, resume_token));
        Ok(id)
    }

    /// Binds a new connection to an existing player record.
    ///
    /// Works in any status, so a player who dropped mid-game can continue
    /// where they left off. A previous connection still bound to the record
    /// is replaced.
    pub fn resume(
        &mut self,
        connection: ConnectionId,
        player_id: PlayerId,
        resume_token: &str,
    ) -> Result<&PlayerRecord, CoordinatorError> {
        if self
            .player(connection)
            .is_some_and(|p| p.id != player_id)
        {
            return Err(CoordinatorError::AlreadyJoined);
        }

        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id && p.resume_token == resume_token)
            .ok_or(CoordinatorError::ResumeRejected)?;

        player.connection = Some(connection);
        info!("Player {} resumed session {}", player.id, self.code);
        Ok(player)
    }

    /// Lobby -> Active, host only.
    pub fn start(&mut self, requester: ConnectionId) -> Result<(), CoordinatorError> {
        if !self.is_host(requester) {
            return Err(CoordinatorError::NotHost);
        }
        if self.status != SessionStatus::Lobby {
            return Err(CoordinatorError::AlreadyStarted);
        }

        self.status = SessionStatus::Active;
        info!(
            "Session {} started with {} players",
            self.code,
            self.players.len()
        );
        Ok(())
    }

    /// Grades an answer. `None` means the action was ignored.
    pub fn submit_answer(
        &mut self,
        connection: ConnectionId,
        answer_index: usize,
        question_index: Option<usize>,
    ) -> Option<AnswerOutcome> {
        if self.status != SessionStatus::Active {
            return None;
        }

        let Session { quiz, players, .. } = self;
        let player = players.iter_mut().find(|p| p.is_bound_to(connection))?;
        let question = quiz.question(player.current_question_index)?;
        let is_correct = player.answer(question, answer_index, question_index)?;

        Some(AnswerOutcome {
            is_correct,
            correct_index: question.correct_index,
            score: player.score,
        })
    }

    /// Moves a player to their next question. `None` means the action was ignored.
    pub fn request_next(&mut self, connection: ConnectionId) -> Option<NextOutcome> {
        if self.status != SessionStatus::Active {
            return None;
        }

        let total = self.quiz.question_count();
        let code = self.code.clone();
        let player = self.player_mut(connection)?;
        let advance = player.advance(total)?;

        if advance == Advance::Finished {
            info!(
                "Player {} finished session {} with score {}",
                player.id, code, player.score
            );
        }

        Some(NextOutcome {
            advance,
            score: player.score,
        })
    }

    /// Counts an anti-cheat report against the reporting player.
    pub fn record_violation(
        &mut self,
        connection: ConnectionId,
        kind: ViolationKind,
    ) -> Option<ViolationNotice> {
        let player = self.player_mut(connection)?;
        player.record_violation(kind.clone());

        Some(ViolationNotice {
            player_id: player.id,
            player_name: player.name.clone(),
            violation_type: kind,
        })
    }

    /// Unbinds a dropped connection from its player record, keeping progress.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<PlayerId> {
        let player = self.player_mut(connection)?;
        player.connection = None;
        Some(player.id)
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.players.iter().map(PlayerRecord::view).collect()
    }

    /// Connected players and the question each one is on.
    pub fn connected_players(&self) -> Vec<(ConnectionId, usize)> {
        self.players
            .iter()
            .filter_map(|p| p.connection.map(|c| (c, p.current_question_index)))
            .collect()
    }

    /// Host followed by every connected player, without duplicates.
    pub fn participants(&self) -> Vec<ConnectionId> {
        let mut participants = vec![self.host];
        for (connection, _) in self.connected_players() {
            if !participants.contains(&connection) {
                participants.push(connection);
            }
        }
        participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Question, POINTS_PER_CORRECT};

    const HOST: ConnectionId = 1;
    const ALICE: ConnectionId = 2;
    const BOB: ConnectionId = 3;

    fn quiz(count: usize) -> QuizSnapshot {
        QuizSnapshot {
            title: "Test Quiz".to_string(),
            questions: (0..count)
                .map(|i| Question {
                    text: format!("Test Question {}?", i + 1),
                    options: vec!["Correct".into(), "Wrong A".into()],
                    correct_index: 0,
                    time_limit_seconds: None,
                })
                .collect(),
            total_time_minutes: Some(5),
        }
    }

    fn session(count: usize) -> Session {
        Session::new(JoinCode::from(123456), HOST, quiz(count), Instant::now())
    }

    fn join(session: &mut Session, connection: ConnectionId, name: &str) -> PlayerId {
        session
            .join(connection, name.to_string(), format!("token-{}", connection))
            .unwrap()
    }

    #[test]
    fn test_new_session_in_lobby() {
        let session = session(2);
        assert_eq!(session.status(), SessionStatus::Lobby);
        assert!(session.players().is_empty());
        assert!(session.is_host(HOST));
        assert!(!session.is_host(ALICE));
    }

    #[test]
    fn test_join_preserves_order() {
        let mut session = session(2);
        let alice = join(&mut session, ALICE, "Alice");
        let bob = join(&mut session, BOB, "Bob");

        assert_ne!(alice, bob);
        let names: Vec<_> = session.roster().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_join_twice_from_same_connection() {
        let mut session = session(2);
        join(&mut session, ALICE, "Alice");
        let result = session.join(ALICE, "Alice again".to_string(), "t".to_string());
        assert_eq!(result, Err(CoordinatorError::AlreadyJoined));
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn test_join_rejected_once_active() {
        let mut session = session(2);
        join(&mut session, ALICE, "Alice");
        session.start(HOST).unwrap();

        let result = session.join(BOB, "Bob".to_string(), "t".to_string());
        assert_eq!(result, Err(CoordinatorError::JoinUnavailable));
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn test_only_host_can_start() {
        let mut session = session(2);
        assert_eq!(session.start(ALICE), Err(CoordinatorError::NotHost));
        assert_eq!(session.status(), SessionStatus::Lobby);

        assert!(session.start(HOST).is_ok());
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.start(HOST), Err(CoordinatorError::AlreadyStarted));
    }

    #[test]
    fn test_actions_ignored_in_lobby() {
        let mut session = session(2);
        join(&mut session, ALICE, "Alice");

        assert!(session.submit_answer(ALICE, 0, None).is_none());
        assert!(session.request_next(ALICE).is_none());
        assert_eq!(session.player(ALICE).unwrap().score, 0);
    }

    #[test]
    fn test_submit_answer_scores() {
        let mut session = session(2);
        join(&mut session, ALICE, "Alice");
        session.start(HOST).unwrap();

        let outcome = session.submit_answer(ALICE, 0, None).unwrap();
        assert_eq!(
            outcome,
            AnswerOutcome {
                is_correct: true,
                correct_index: 0,
                score: POINTS_PER_CORRECT,
            }
        );
    }

    #[test]
    fn test_repeat_answer_after_resume_is_not_regraded() {
        let mut session = session(2);
        let alice = join(&mut session, ALICE, "Alice");
        session.start(HOST).unwrap();

        session.submit_answer(ALICE, 0, Some(0)).unwrap();
        session.disconnect(ALICE);
        session.resume(9, alice, "token-2").unwrap();

        let repeat = session.submit_answer(9, 1, Some(0)).unwrap();
        assert_eq!(
            repeat,
            AnswerOutcome {
                is_correct: true,
                correct_index: 0,
                score: POINTS_PER_CORRECT,
            }
        );
    }

    #[test]
    fn test_unknown_player_ignored() {
        let mut session = session(2);
        session.start(HOST).unwrap();

        assert!(session.submit_answer(BOB, 0, None).is_none());
        assert!(session.request_next(BOB).is_none());
        assert!(session.record_violation(BOB, ViolationKind::Blur).is_none());
    }

    #[test]
    fn test_request_next_to_finish() {
        let mut session = session(2);
        join(&mut session, ALICE, "Alice");
        session.start(HOST).unwrap();

        session.submit_answer(ALICE, 0, None);
        let first = session.request_next(ALICE).unwrap();
        assert_eq!(first.advance, Advance::Question(1));

        session.submit_answer(ALICE, 1, None);
        let last = session.request_next(ALICE).unwrap();
        assert_eq!(last.advance, Advance::Finished);
        assert_eq!(last.score, POINTS_PER_CORRECT);

        let alice = session.player(ALICE).unwrap();
        assert!(alice.finished);
        assert_eq!(alice.current_question_index, 2);

        assert!(session.request_next(ALICE).is_none());
        assert!(session.submit_answer(ALICE, 0, None).is_none());
    }

    #[test]
    fn test_violation_notice() {
        let mut session = session(1);
        let alice = join(&mut session, ALICE, "Alice");

        let notice = session
            .record_violation(ALICE, ViolationKind::Resize)
            .unwrap();
        assert_eq!(notice.player_id, alice);
        assert_eq!(notice.player_name, "Alice");
        assert_eq!(notice.violation_type, ViolationKind::Resize);
    }

    #[test]
    fn test_disconnect_and_resume() {
        let mut session = session(3);
        let alice = join(&mut session, ALICE, "Alice");
        session.start(HOST).unwrap();
        session.submit_answer(ALICE, 0, None);
        session.request_next(ALICE);

        assert_eq!(session.disconnect(ALICE), Some(alice));
        assert!(session.player(ALICE).is_none());
        assert!(session.connected_players().is_empty());

        assert_eq!(
            session.resume(9, alice, "wrong").unwrap_err(),
            CoordinatorError::ResumeRejected
        );

        let resumed = session.resume(9, alice, "token-2").unwrap();
        assert_eq!(resumed.score, POINTS_PER_CORRECT);
        assert_eq!(resumed.current_question_index, 1);
        assert_eq!(session.connected_players(), vec![(9, 1)]);
    }

    #[test]
    fn test_participants_include_host_once() {
        let mut session = session(1);
        join(&mut session, ALICE, "Alice");
        join(&mut session, HOST, "Host playing along");
        join(&mut session, BOB, "Bob");
        session.disconnect(BOB);

        assert_eq!(session.participants(), vec![HOST, ALICE]);
    }

    #[test]
    fn test_idle_detection() {
        let start = Instant::now();
        let mut session = Session::new(JoinCode::from(111111), HOST, quiz(1), start);
        let timeout = Duration::from_secs(60);

        assert!(!session.is_idle(start + Duration::from_secs(30), timeout));
        assert!(session.is_idle(start + Duration::from_secs(61), timeout));

        session.touch(start + Duration::from_secs(50));
        assert!(!session.is_idle(start + Duration::from_secs(61), timeout));
    }
}
