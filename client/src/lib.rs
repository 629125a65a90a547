//! # Session Client Library
//!
//! Client side of the multiplayer session layer. It connects to the
//! authoritative server over UDP, keeps an estimate of the server clock and
//! rebuilds smooth movement for every remote player from a lossy, unordered
//! stream of position packets.
//!
//! ## Architecture Overview
//!
//! The protocol logic is written as plain state machines that take the
//! current time as an argument and never block. A thin transport
//! ([`network::NetworkClient`]) feeds them datagrams and sends what they
//! produce, so the same code runs inside a macroquad frame loop, a tokio task
//! or a test that shuttles packets by hand.
//!
//! ### Connection Handshake
//! The client asks to connect, waits up to two seconds for the approval and
//! asks again if none arrives. The approval carries the assigned player id
//! and the server time, which seeds the local clock estimate.
//!
//! ### Clock Synchronization
//! The server sends its time four times a second and the client re-seeds on
//! every one of them. Outgoing packets are stamped with the estimate.
//!
//! ### Remote Players
//! The server announces joins and departures until they are acknowledged.
//! Each remote player keeps the four newest position samples. Two moving
//! samples in a row switch on dead reckoning along the last step, anything
//! else snaps to the newest sample.
//!
//! ## Module Organization
//!
//! - `clock`: server clock estimate
//! - `connection`: handshake state machine
//! - `events`: session events, observers and the dispatcher
//! - `input`: local input source and position reports
//! - `interpolation`: per-player reconstruction buffer
//! - `players`: roster of remote players
//! - `session`: everything above wired together
//! - `network`: non-blocking UDP transport
//! - `rendering`: macroquad presentation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::events::SessionEvent;
//! use client::input::InputSource;
//! use client::network::NetworkClient;
//! use shared::NetworkConfig;
//!
//! struct Standing;
//!
//! impl InputSource for Standing {
//!     fn local_input_vector(&self) -> (f32, f32) {
//!         (0.0, 0.0)
//!     }
//!
//!     fn current_local_position(&self) -> (f32, f32) {
//!         (0.0, 0.0)
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = NetworkClient::connect(&NetworkConfig::dev_default())?;
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SessionEvent>();
//!     client.subscribe(Box::new(tx));
//!
//!     loop {
//!         client.poll(1.0 / 60.0, &Standing);
//!         while let Ok(event) = rx.try_recv() {
//!             println!("{:?}", event);
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(16));
//!     }
//! }
//! ```

pub mod clock;
pub mod connection;
pub mod events;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod players;
pub mod rendering;
pub mod session;
