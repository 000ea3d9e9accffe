//! Game coordinator
//!
//! Translates inbound client packets into session mutations and produces the
//! resulting notifications, each addressed to a single connection. The
//! coordinator never touches sockets: callers deliver the returned
//! `Outbound` list in order.
//!
//! ## Addressing
//! - *host*: the session's host connection only
//! - *player*: the connection that sent the action
//! - *session*: the host plus every connected player
//!
//! ## Failures
//! Entry-point actions (generate, create, join, rejoin, start, end) answer
//! the requester with an `error` packet. Mid-game actions from unknown or
//! finished players are dropped without a reply.

use crate::client_manager::ConnectionId;
use crate::error::CoordinatorError;
use crate::player::Advance;
use crate::quiz_store::{MemoryQuizStore, QuizRequest, QuizStore};
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionStatus};
use log::{debug, info};
use shared::{
    ClientPacket, JoinCode, PlayerId, QuizId, ServerPacket, ViolationKind, ViolationNotice,
    DEFAULT_QUESTION_COUNT,
};
use std::time::{Duration, Instant};

/// A packet addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: ConnectionId,
    pub packet: ServerPacket,
}

#[derive(Default)]
struct Outbox {
    deliveries: Vec<Outbound>,
}

impl Outbox {
    fn to_player(&mut self, to: ConnectionId, packet: ServerPacket) {
        self.deliveries.push(Outbound { to, packet });
    }

    fn to_host(&mut self, session: &Session, packet: ServerPacket) {
        self.to_player(session.host(), packet);
    }

    fn to_session(&mut self, session: &Session, packet: ServerPacket) {
        for to in session.participants() {
            self.to_player(to, packet.clone());
        }
    }

    /// Full roster for the host, optionally flagged with a fresh violation
    fn dashboard(&mut self, session: &Session, violation: Option<ViolationNotice>) {
        self.to_host(
            session,
            ServerPacket::DashboardUpdate {
                players: session.roster(),
                violation,
            },
        );
    }
}

pub struct Coordinator<Q = MemoryQuizStore> {
    registry: SessionRegistry,
    quizzes: Q,
}

impl<Q: QuizStore> Coordinator<Q> {
    pub fn new(registry: SessionRegistry, quizzes: Q) -> Self {
        Self { registry, quizzes }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn quizzes_mut(&mut self) -> &mut Q {
        &mut self.quizzes
    }

    /// Applies one inbound packet and returns the notifications it causes
    pub fn handle(&mut self, from: ConnectionId, packet: ClientPacket, now: Instant) -> Vec<Outbound> {
        let mut outbox = Outbox::default();

        let result = match packet {
            ClientPacket::GenerateQuiz {
                topic,
                question_count,
                time_limit_minutes,
            } => {
                let request = QuizRequest {
                    topic,
                    question_count: question_count.unwrap_or(DEFAULT_QUESTION_COUNT),
                    time_limit_minutes,
                };
                self.generate_quiz(from, &request, &mut outbox)
            }
            ClientPacket::CreateSession { quiz_id } => {
                self.create_session(from, &quiz_id, now, &mut outbox)
            }
            ClientPacket::JoinSession { code, name } => {
                self.join_session(from, &code, name, now, &mut outbox)
            }
            ClientPacket::RejoinSession {
                code,
                player_id,
                resume_token,
            } => self.rejoin_session(from, &code, player_id, &resume_token, now, &mut outbox),
            ClientPacket::StartSession { code } => {
                self.start_session(from, &code, now, &mut outbox)
            }
            ClientPacket::EndSession { code } => self.end_session_by_host(from, &code, &mut outbox),
            ClientPacket::SubmitAnswer {
                code,
                answer_index,
                question_index,
            } => {
                self.submit_answer(from, &code, answer_index, question_index, now, &mut outbox);
                Ok(())
            }
            ClientPacket::RequestNext { code } => {
                self.request_next(from, &code, now, &mut outbox);
                Ok(())
            }
            ClientPacket::ReportViolation {
                code,
                violation_type,
            } => {
                self.report_violation(from, &code, violation_type, now, &mut outbox);
                Ok(())
            }
        };

        if let Err(err) = result {
            info!(
                "Rejected action from connection {}: {} ({:?})",
                from,
                err,
                err.kind()
            );
            outbox.to_player(from, ServerPacket::error(err.to_string()));
        }

        outbox.deliveries
    }

    /// Handles a closed connection
    ///
    /// Sessions hosted by the connection end. Player records bound to it are
    /// kept but marked disconnected so the player can resume.
    pub fn disconnect(&mut self, connection: ConnectionId, now: Instant) -> Vec<Outbound> {
        let mut outbox = Outbox::default();
        let mut hosted = Vec::new();

        for code in self.registry.codes() {
            let Some(session) = self.registry.get_session_mut(&code) else {
                continue;
            };
            if session.is_host(connection) {
                hosted.push(code);
            } else if let Some(player_id) = session.disconnect(connection) {
                info!(
                    "Player {} of session {} disconnected",
                    player_id,
                    session.code()
                );
                session.touch(now);
                outbox.dashboard(session, None);
            }
        }

        for code in hosted {
            self.end_session(&code, "Host disconnected", Some(connection), &mut outbox);
        }

        outbox.deliveries
    }

    /// Ends every session that saw no action for longer than `timeout`
    pub fn reap_idle(&mut self, now: Instant, timeout: Duration) -> Vec<Outbound> {
        let mut outbox = Outbox::default();

        let idle: Vec<JoinCode> = self
            .registry
            .codes()
            .into_iter()
            .filter(|code| {
                self.registry
                    .get_session(code)
                    .is_some_and(|session| session.is_idle(now, timeout))
            })
            .collect();

        for code in idle {
            info!("Reaping idle session {}", code);
            self.end_session(&code, "Session expired after inactivity", None, &mut outbox);
        }

        outbox.deliveries
    }

    fn generate_quiz(
        &mut self,
        from: ConnectionId,
        request: &QuizRequest,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let quiz_id = self
            .quizzes
            .generate_quiz(request)
            .map_err(|e| CoordinatorError::Generation(e.to_string()))?;
        let quiz = self
            .quizzes
            .get_quiz(&quiz_id)
            .ok_or(CoordinatorError::QuizNotFound)?;

        outbox.to_player(
            from,
            ServerPacket::QuizGenerated {
                quiz_id,
                title: quiz.title,
                question_count: quiz.questions.len(),
            },
        );
        Ok(())
    }

    fn create_session(
        &mut self,
        from: ConnectionId,
        quiz_id: &QuizId,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .ok_or(CoordinatorError::QuizNotFound)?;
        if quiz.questions.is_empty() {
            return Err(CoordinatorError::EmptyQuiz);
        }

        let code = self.registry.create_session(from, quiz, now)?;
        outbox.to_player(from, ServerPacket::SessionCreated { code });
        Ok(())
    }

    fn join_session(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        name: String,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let resume_token = self.registry.issue_resume_token();
        let session = self
            .registry
            .get_session_mut(code)
            .ok_or(CoordinatorError::JoinUnavailable)?;

        let player_id = session.join(from, name, resume_token.clone())?;
        session.touch(now);

        outbox.to_player(
            from,
            ServerPacket::JoinedSession {
                code: code.clone(),
                player_id,
                resume_token,
            },
        );
        outbox.to_host(
            session,
            ServerPacket::PlayerJoined {
                players: session.roster(),
            },
        );
        Ok(())
    }

    fn rejoin_session(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        player_id: PlayerId,
        resume_token: &str,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let session = self
            .registry
            .get_session_mut(code)
            .ok_or(CoordinatorError::SessionNotFound)?;

        let (score, finished, question_index) = {
            let player = session.resume(from, player_id, resume_token)?;
            (player.score, player.finished, player.current_question_index)
        };
        session.touch(now);

        outbox.to_player(
            from,
            ServerPacket::RejoinedSession {
                code: code.clone(),
                player_id,
                score,
                finished,
            },
        );

        if session.status() == SessionStatus::Active {
            outbox.to_player(
                from,
                ServerPacket::SessionStarted {
                    total_time_minutes: session.quiz().total_time_or_default(),
                },
            );
            if !finished {
                if let Some(packet) = ServerPacket::new_question(session.quiz(), question_index) {
                    outbox.to_player(from, packet);
                }
            }
        }

        outbox.dashboard(session, None);
        Ok(())
    }

    fn start_session(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let session = self
            .registry
            .get_session_mut(code)
            .ok_or(CoordinatorError::SessionNotFound)?;

        session.start(from)?;
        session.touch(now);

        outbox.to_session(
            session,
            ServerPacket::SessionStarted {
                total_time_minutes: session.quiz().total_time_or_default(),
            },
        );
        for (connection, question_index) in session.connected_players() {
            if let Some(packet) = ServerPacket::new_question(session.quiz(), question_index) {
                outbox.to_player(connection, packet);
            }
        }
        Ok(())
    }

    fn end_session_by_host(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        outbox: &mut Outbox,
    ) -> Result<(), CoordinatorError> {
        let session = self
            .registry
            .get_session(code)
            .ok_or(CoordinatorError::SessionNotFound)?;
        if !session.is_host(from) {
            return Err(CoordinatorError::NotHost);
        }

        self.end_session(code, "Host ended the game", None, outbox);
        Ok(())
    }

    /// Removes a session and tells everyone still in it
    fn end_session(
        &mut self,
        code: &JoinCode,
        reason: &str,
        skip: Option<ConnectionId>,
        outbox: &mut Outbox,
    ) {
        if let Some(session) = self.registry.remove_session(code) {
            info!("Session {} ended: {}", code, reason);
            for to in session.participants() {
                if Some(to) != skip {
                    outbox.to_player(
                        to,
                        ServerPacket::SessionEnded {
                            reason: reason.to_string(),
                        },
                    );
                }
            }
        }
    }

    fn submit_answer(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        answer_index: usize,
        question_index: Option<usize>,
        now: Instant,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.registry.get_session_mut(code) else {
            debug!("Answer from {} for unknown session {}", from, code);
            return;
        };
        let Some(outcome) = session.submit_answer(from, answer_index, question_index) else {
            debug!("Answer from {} in session {} ignored", from, code);
            return;
        };
        session.touch(now);

        outbox.to_player(
            from,
            ServerPacket::AnswerResult {
                is_correct: outcome.is_correct,
                correct_index: outcome.correct_index,
                score: outcome.score,
            },
        );
        outbox.dashboard(session, None);
    }

    fn request_next(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        now: Instant,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.registry.get_session_mut(code) else {
            debug!("Next request from {} for unknown session {}", from, code);
            return;
        };
        let Some(outcome) = session.request_next(from) else {
            debug!("Next request from {} in session {} ignored", from, code);
            return;
        };
        session.touch(now);

        match outcome.advance {
            Advance::Question(index) => {
                if let Some(packet) = ServerPacket::new_question(session.quiz(), index) {
                    outbox.to_player(from, packet);
                }
            }
            Advance::Finished => {
                outbox.to_player(
                    from,
                    ServerPacket::SessionOver {
                        score: outcome.score,
                        total_questions: session.quiz().question_count(),
                        quiz: session.quiz().clone(),
                    },
                );
                outbox.dashboard(session, None);
            }
        }
    }

    fn report_violation(
        &mut self,
        from: ConnectionId,
        code: &JoinCode,
        kind: ViolationKind,
        now: Instant,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.registry.get_session_mut(code) else {
            debug!("Violation from {} for unknown session {}", from, code);
            return;
        };
        let Some(notice) = session.record_violation(from, kind) else {
            debug!("Violation from {} in session {} ignored", from, code);
            return;
        };
        session.touch(now);

        info!(
            "Violation in session {}: {} {} ({})",
            code,
            notice.player_name,
            notice.violation_type.describe(),
            notice.violation_type
        );
        outbox.dashboard(session, Some(notice));
    }
}
