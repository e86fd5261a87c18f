//! Runner Royale - shared-session runtime for a runner game
//!
//! The runner engine itself (rendering, physics, obstacle sprites) is an
//! external collaborator; this crate owns everything that keeps many
//! independently running game instances in one consistent session:
//! - the deterministic seeded RNG and the shared simulation clock
//! - the JSON session protocol between clients and the room server
//! - the authoritative room server (membership, host, countdown, start)
//! - the client session controller and the rival proxy reconciler

pub mod app;
pub mod config;
pub mod http;
pub mod room;
pub mod session;
pub mod sim;
pub mod util;
pub mod ws;
