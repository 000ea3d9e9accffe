//! Session registry
//!
//! Owns every live session keyed by its join code. Codes are random six
//! digit numbers; a freshly drawn code that is already taken is redrawn so
//! two live sessions never share a code.

use crate::client_manager::ConnectionId;
use crate::error::CoordinatorError;
use crate::session::Session;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{JoinCode, QuizSnapshot, JOIN_CODE_MAX, JOIN_CODE_MIN};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Instant;

/// Attempts at drawing an unused code before giving up
const MAX_CODE_ATTEMPTS: usize = 64;

const RESUME_TOKEN_LEN: usize = 16;

pub struct SessionRegistry {
    sessions: HashMap<JoinCode, Session>,
    rng: StdRng,
    code_range: RangeInclusive<u32>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy(), JOIN_CODE_MIN..=JOIN_CODE_MAX)
    }

    /// Registry with a deterministic code sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), JOIN_CODE_MIN..=JOIN_CODE_MAX)
    }

    /// Registry drawing codes from a custom range
    pub fn with_code_range(seed: u64, code_range: RangeInclusive<u32>) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), code_range)
    }

    fn from_rng(rng: StdRng, code_range: RangeInclusive<u32>) -> Self {
        Self {
            sessions: HashMap::new(),
            rng,
            code_range,
        }
    }

    /// Stores a new lobby session for `host` and returns its join code
    pub fn create_session(
        &mut self,
        host: ConnectionId,
        quiz: QuizSnapshot,
        now: Instant,
    ) -> Result<JoinCode, CoordinatorError> {
        let code = self.generate_code()?;
        info!(
            "Session {} created by connection {} ({})",
            code, host, quiz.title
        );
        self.sessions
            .insert(code.clone(), Session::new(code.clone(), host, quiz, now));
        Ok(code)
    }

    fn generate_code(&mut self) -> Result<JoinCode, CoordinatorError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = JoinCode::from(self.rng.gen_range(self.code_range.clone()));
            if !self.sessions.contains_key(&code) {
                return Ok(code);
            }
        }
        warn!(
            "No free join code after {} attempts ({} live sessions)",
            MAX_CODE_ATTEMPTS,
            self.sessions.len()
        );
        Err(CoordinatorError::CodesExhausted)
    }

    /// Random secret handed to a player for resuming after a disconnect
    pub fn issue_resume_token(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(RESUME_TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    pub fn get_session(&self, code: &JoinCode) -> Option<&Session> {
        self.sessions.get(code)
    }

    pub fn get_session_mut(&mut self, code: &JoinCode) -> Option<&mut Session> {
        self.sessions.get_mut(code)
    }

    pub fn remove_session(&mut self, code: &JoinCode) -> Option<Session> {
        let removed = self.sessions.remove(code);
        if removed.is_some() {
            info!("Session {} removed", code);
        }
        removed
    }

    /// Snapshot of live codes, so callers can end sessions while walking them
    pub fn codes(&self) -> Vec<JoinCode> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
