//! # Quiz Server Library
//!
//! This library provides the authoritative server for live, host-driven quiz
//! games. A host creates a session from a stored quiz and shares a six digit
//! join code; players join, then progress through the questions at their own
//! pace while the host watches a live dashboard of scores and anti-cheat
//! reports.
//!
//! ## Core Responsibilities
//!
//! ### Session Lifecycle
//! Sessions move from `Lobby` (accepting joins) to `Active` (answering) when
//! the host starts them, and end when the host leaves, ends them explicitly
//! or lets them sit idle.
//!
//! ### Authoritative Scoring
//! Players submit answer indices only. The server grades every answer against
//! its own copy of the quiz, so the correct answer never has to reach a
//! player before they answer.
//!
//! ### Dashboard Broadcasting
//! Every change to a player (score, progress, completion, violations,
//! connectivity) pushes a complete roster to the host.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One loop task owns every session and every connection record. Connection
//! tasks only decode and encode frames and talk to the loop over channels, so
//! session state needs no locks.
//!
//! ### WebSocket Transport
//! Each packet is one JSON text frame of the form
//! `{"event": "...", "data": {...}}`.
//!
//! ## Module Organization
//!
//! - `client_manager`: live connections, capacity and outbound delivery
//! - `coordinator`: turns client packets into session changes and addressed replies
//! - `error`: failures an action can report back to its sender
//! - `network`: listener, per-connection tasks and the main loop
//! - `player`: per-player progress and grading
//! - `quiz_store`: quiz generation and storage
//! - `registry`: live sessions by join code
//! - `session`: the lobby/active state machine
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Accepts WebSocket connections, routes every packet through the
//!     // coordinator and periodically ends idle sessions
//!     Server::new(config).await?.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod player;
pub mod quiz_store;
pub mod registry;
pub mod session;
