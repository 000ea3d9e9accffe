//! Scripted host: builds a quiz, opens a session and watches the dashboard

use crate::network::{ClientError, QuizConnection};
use log::{info, warn};
use shared::{ClientPacket, JoinCode, PlayerView, ServerPacket, ViolationNotice};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub topic: String,
    pub question_count: Option<usize>,
    pub time_limit_minutes: Option<u32>,
    /// Start once this many players are in the lobby
    pub expected_players: usize,
    /// Longest wait for any single server reply
    pub reply_timeout: Duration,
    /// Longest wait for the lobby to fill or the players to finish
    pub game_timeout: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            topic: "test".to_string(),
            question_count: None,
            time_limit_minutes: None,
            expected_players: 1,
            reply_timeout: Duration::from_secs(5),
            game_timeout: Duration::from_secs(300),
        }
    }
}

/// What the host saw by the time every player finished
#[derive(Debug, Clone)]
pub struct HostReport {
    pub code: JoinCode,
    pub players: Vec<PlayerView>,
    pub violations: Vec<ViolationNotice>,
}

pub struct HostBot {
    conn: QuizConnection,
    options: HostOptions,
}

impl HostBot {
    pub fn new(conn: QuizConnection, options: HostOptions) -> Self {
        Self { conn, options }
    }

    /// Generates a quiz and opens a lobby for it
    pub async fn create_session(&mut self) -> Result<JoinCode, ClientError> {
        self.conn
            .send(&ClientPacket::GenerateQuiz {
                topic: self.options.topic.clone(),
                question_count: self.options.question_count,
                time_limit_minutes: self.options.time_limit_minutes,
            })
            .await?;
        let quiz_id = self
            .conn
            .expect("quiz_generated", self.options.reply_timeout, |packet| match packet {
                ServerPacket::QuizGenerated {
                    quiz_id,
                    title,
                    question_count,
                } => {
                    info!("Generated \"{}\" with {} questions", title, question_count);
                    Some(quiz_id)
                }
                _ => None,
            })
            .await?;

        self.conn.send(&ClientPacket::CreateSession { quiz_id }).await?;
        let code = self
            .conn
            .expect("session_created", self.options.reply_timeout, |packet| match packet {
                ServerPacket::SessionCreated { code } => Some(code),
                _ => None,
            })
            .await?;

        info!("Session open, join code {}", code);
        Ok(code)
    }

    /// Waits until the lobby holds the expected number of players
    pub async fn wait_for_players(&mut self) -> Result<Vec<PlayerView>, ClientError> {
        let expected = self.options.expected_players;
        if lobby_ready(&[], expected) {
            return Ok(Vec::new());
        }

        self.conn
            .expect("players", self.options.game_timeout, |packet| match packet {
                ServerPacket::PlayerJoined { players } => {
                    info!("Lobby: {}/{} players", players.len(), expected);
                    lobby_ready(&players, expected).then_some(players)
                }
                _ => None,
            })
            .await
    }

    pub async fn start(&mut self, code: &JoinCode) -> Result<u32, ClientError> {
        self.conn
            .send(&ClientPacket::StartSession { code: code.clone() })
            .await?;
        self.conn
            .expect("session_started", self.options.reply_timeout, |packet| match packet {
                ServerPacket::SessionStarted { total_time_minutes } => Some(total_time_minutes),
                _ => None,
            })
            .await
    }

    /// Follows dashboard updates until every player has finished
    pub async fn watch(&mut self, code: &JoinCode) -> Result<HostReport, ClientError> {
        let mut violations = Vec::new();

        let players = self
            .conn
            .expect("all players finished", self.options.game_timeout, |packet| {
                let ServerPacket::DashboardUpdate { players, violation } = packet else {
                    return None;
                };
                if let Some(notice) = violation {
                    warn!(
                        "{} {} ({})",
                        notice.player_name,
                        notice.violation_type.describe(),
                        notice.violation_type
                    );
                    violations.push(notice);
                }
                print_dashboard(&players);

                all_finished(&players).then_some(players)
            })
            .await?;

        Ok(HostReport {
            code: code.clone(),
            players,
            violations,
        })
    }

    pub async fn end(mut self, code: &JoinCode) -> Result<(), ClientError> {
        self.conn
            .send(&ClientPacket::EndSession { code: code.clone() })
            .await?;
        match self
            .conn
            .expect("session_ended", self.options.reply_timeout, |_| None::<()>)
            .await
        {
            Err(ClientError::SessionEnded(reason)) => {
                info!("Session {} closed: {}", code, reason);
                self.conn.close().await
            }
            Err(e) => Err(e),
            Ok(()) => Ok(()),
        }
    }

    /// Full host flow: create, fill lobby, start, watch, end
    ///
    /// `on_code` sees the join code as soon as the lobby opens, so players
    /// can be pointed at it.
    pub async fn run<F>(mut self, on_code: F) -> Result<HostReport, ClientError>
    where
        F: FnOnce(&JoinCode),
    {
        let code = self.create_session().await?;
        on_code(&code);
        self.wait_for_players().await?;
        let minutes = self.start(&code).await?;
        info!("Session {} started, {} minutes on the clock", code, minutes);

        let report = self.watch(&code).await?;
        self.end(&code).await?;
        Ok(report)
    }
}

fn lobby_ready(players: &[PlayerView], expected: usize) -> bool {
    players.len() >= expected
}

/// An empty roster is never finished
fn all_finished(players: &[PlayerView]) -> bool {
    !players.is_empty() && players.iter().all(|p| p.finished)
}

fn print_dashboard(players: &[PlayerView]) {
    for player in players {
        info!(
            "  {:<16} score {:>3}  question {:>3}{}  violations {}{}",
            player.name,
            player.score,
            player.current_question_index + 1,
            if player.finished { " (done)" } else { "" },
            player.violation_count,
            if player.connected { "" } else { "  [offline]" },
        );
    }
}
