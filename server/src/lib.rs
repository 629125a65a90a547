//! # Session Server Library
//!
//! Authoritative server for the multiplayer session layer. It accepts peers
//! over UDP, hands out player ids, keeps every peer's clock in step with its
//! own and relays movement between peers.
//!
//! ## Core Responsibilities
//!
//! ### Connection Handshake
//! A peer asks to connect, the server approves with a freshly assigned player
//! id and its current time, and the peer confirms. Lost approvals are resent
//! when the peer retries. A gameplay packet from a peer still waiting to
//! confirm counts as the confirmation. When the server is full it declines.
//!
//! ### Player Awareness
//! Datagrams can be lost, so joins and departures are announced again and
//! again until each peer acknowledges them. Every peer carries its own
//! awareness map and receives at most one announcement per 100 ms.
//!
//! ### Time Synchronization
//! The server clock is the session's authority. Every 250 ms each connected
//! peer receives the current server time.
//!
//! ### Timeouts
//! A peer that stays silent for 7.5 seconds is evicted and every other peer
//! is told it left. The server never broadcasts a shutdown.
//!
//! ## Module Organization
//!
//! - `awareness`: per-peer announcement bookkeeping
//! - `connection`: state for one remote address
//! - `registry`: the protocol state machine, free of I/O
//! - `network`: tokio UDP driver running the tick loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(
//!         "127.0.0.1:55123".parse()?,
//!         Duration::from_millis(16),
//!         32,
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod awareness;
pub mod connection;
pub mod network;
pub mod registry;
