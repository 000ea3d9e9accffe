//! # Quiz Client Library
//!
//! Scripted clients for the live quiz server. They speak the same JSON over
//! WebSocket protocol as a browser front end would, which makes them useful
//! for load testing, demos and end-to-end tests.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! A thin wrapper over one WebSocket connection:
//! - Packet encoding and decoding
//! - Waiting for a specific reply with a timeout
//! - Optional artificial latency
//!
//! ### Host Module (`host`)
//! Drives the host side of a game: generates a quiz, opens a session, waits
//! for the lobby to fill, starts the game and follows the dashboard until
//! every player has finished.
//!
//! ### Player Module (`player`)
//! Drives one player: joins with a name, answers every question with a
//! configurable strategy and can report anti-cheat violations.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::host::{HostBot, HostOptions};
//! use client::network::QuizConnection;
//! use client::player::{PlayerBot, PlayerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = "ws://127.0.0.1:8080";
//!
//!     let mut host = HostBot::new(QuizConnection::connect(url).await?, HostOptions::default());
//!     let code = host.create_session().await?;
//!
//!     let player = PlayerBot::new(QuizConnection::connect(url).await?, PlayerOptions::new("Alice"));
//!     let game = tokio::spawn({
//!         let code = code.clone();
//!         async move { player.run(&code).await }
//!     });
//!
//!     host.wait_for_players().await?;
//!     host.start(&code).await?;
//!     let report = host.watch(&code).await?;
//!     println!("{:?}", report.players);
//!
//!     game.await??;
//!     Ok(())
//! }
//! ```

pub mod host;
pub mod network;
pub mod player;
