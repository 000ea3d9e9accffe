//! Scripted player: joins a session and answers every question

use crate::network::{ClientError, QuizConnection};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ClientPacket, JoinCode, PlayerId, ServerPacket, ViolationKind};
use std::time::Duration;
use tokio::time::sleep;

/// How the bot picks an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnswerStrategy {
    First,
    Last,
    Random,
}

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub name: String,
    pub strategy: AnswerStrategy,
    /// Reported once, right after the first question arrives
    pub violations: Vec<ViolationKind>,
    /// Pause before answering each question
    pub think_time: Duration,
    pub reply_timeout: Duration,
    /// Longest wait in the lobby for the host to start
    pub start_timeout: Duration,
}

impl PlayerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: AnswerStrategy::First,
            violations: Vec::new(),
            think_time: Duration::ZERO,
            reply_timeout: Duration::from_secs(5),
            start_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerReport {
    pub player_id: PlayerId,
    pub score: u32,
    pub total_questions: usize,
    /// Whether each answer was graded correct, in question order
    pub answers: Vec<bool>,
}

/// Picks an option index out of `options`
///
/// A question with no options still gets index 0 so the server can grade it.
pub fn choose_answer<R: Rng>(strategy: AnswerStrategy, options: usize, rng: &mut R) -> usize {
    match strategy {
        AnswerStrategy::First => 0,
        AnswerStrategy::Last => options.saturating_sub(1),
        AnswerStrategy::Random => rng.gen_range(0..options.max(1)),
    }
}

enum Step {
    Question { index: usize, options: usize },
    Over { score: u32, total_questions: usize },
}

pub struct PlayerBot {
    conn: QuizConnection,
    options: PlayerOptions,
    rng: StdRng,
    player_id: Option<PlayerId>,
}

impl PlayerBot {
    pub fn new(conn: QuizConnection, options: PlayerOptions) -> Self {
        Self {
            conn,
            options,
            rng: StdRng::from_entropy(),
            player_id: None,
        }
    }

    /// Bot with a reproducible random strategy
    pub fn with_seed(conn: QuizConnection, options: PlayerOptions, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(conn, options)
        }
    }

    pub async fn join(&mut self, code: &JoinCode) -> Result<PlayerId, ClientError> {
        self.conn
            .send(&ClientPacket::JoinSession {
                code: code.clone(),
                name: self.options.name.clone(),
            })
            .await?;
        let player_id = self
            .conn
            .expect("joined_session", self.options.reply_timeout, |packet| match packet {
                ServerPacket::JoinedSession { player_id, .. } => Some(player_id),
                _ => None,
            })
            .await?;

        info!("{} joined {} as {}", self.options.name, code, player_id);
        self.player_id = Some(player_id);
        Ok(player_id)
    }

    async fn next_step(&mut self, wait: Duration) -> Result<Step, ClientError> {
        self.conn
            .expect("question or results", wait, |packet| match packet {
                ServerPacket::NewQuestion {
                    question_index,
                    options,
                    ..
                } => Some(Step::Question {
                    index: question_index,
                    options: options.len(),
                }),
                ServerPacket::SessionOver {
                    score,
                    total_questions,
                    ..
                } => Some(Step::Over {
                    score,
                    total_questions,
                }),
                _ => None,
            })
            .await
    }

    /// Answers questions until the server reports the end of the quiz
    pub async fn play(&mut self, code: &JoinCode) -> Result<PlayerReport, ClientError> {
        let player_id = self.player_id.ok_or(ClientError::NotJoined)?;
        let mut answers = Vec::new();
        let mut wait = self.options.start_timeout;

        loop {
            match self.next_step(wait).await? {
                Step::Question { index, options } => {
                    wait = self.options.reply_timeout;

                    if index == 0 {
                        for kind in self.options.violations.clone() {
                            self.conn
                                .send(&ClientPacket::ReportViolation {
                                    code: code.clone(),
                                    violation_type: kind,
                                })
                                .await?;
                        }
                    }

                    if !self.options.think_time.is_zero() {
                        sleep(self.options.think_time).await;
                    }

                    let answer_index =
                        choose_answer(self.options.strategy, options, &mut self.rng);
                    self.conn
                        .send(&ClientPacket::SubmitAnswer {
                            code: code.clone(),
                            answer_index,
                            question_index: Some(index),
                        })
                        .await?;
                    let is_correct = self
                        .conn
                        .expect("answer_result", wait, |packet| match packet {
                            ServerPacket::AnswerResult { is_correct, .. } => Some(is_correct),
                            _ => None,
                        })
                        .await?;
                    answers.push(is_correct);

                    self.conn
                        .send(&ClientPacket::RequestNext { code: code.clone() })
                        .await?;
                }
                Step::Over {
                    score,
                    total_questions,
                } => {
                    info!(
                        "{} finished with {}/{}",
                        self.options.name, score, total_questions
                    );
                    return Ok(PlayerReport {
                        player_id,
                        score,
                        total_questions,
                        answers,
                    });
                }
            }
        }
    }

    pub async fn run(mut self, code: &JoinCode) -> Result<PlayerReport, ClientError> {
        self.join(code).await?;
        let report = self.play(code).await?;
        self.conn.close().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PlayerOptions::new("Alice");
        assert_eq!(options.name, "Alice");
        assert_eq!(options.strategy, AnswerStrategy::First);
        assert!(options.violations.is_empty());
    }

    #[test]
    fn test_fixed_strategies() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(choose_answer(AnswerStrategy::First, 4, &mut rng), 0);
        assert_eq!(choose_answer(AnswerStrategy::Last, 4, &mut rng), 3);
    }

    #[test]
    fn test_no_options_still_answers_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(choose_answer(AnswerStrategy::First, 0, &mut rng), 0);
        assert_eq!(choose_answer(AnswerStrategy::Last, 0, &mut rng), 0);
        assert_eq!(choose_answer(AnswerStrategy::Random, 0, &mut rng), 0);
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let picks: Vec<usize> = (0..200)
            .map(|_| choose_answer(AnswerStrategy::Random, 4, &mut rng))
            .collect();

        assert!(picks.iter().all(|&i| i < 4));
        // 200 draws over 4 options hit every option
        for option in 0..4 {
            assert!(picks.contains(&option));
        }
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| choose_answer(AnswerStrategy::Random, 4, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(17), draw(17));
    }
}
