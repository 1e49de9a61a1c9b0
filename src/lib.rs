//! Road Dogs game server
//!
//! Authoritative simulation of dogs roaming a road network, picking up lost
//! items and carrying them to offices, exposed over a JSON HTTP API.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod http;
pub mod players;
pub mod util;
