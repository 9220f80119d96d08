//! Ocean Arena: an authoritative host for a shared 2D ocean where boats
//! float on spring-driven waves and trade cannon fire.
//!
//! - `game`: water, entities, physics, NPCs and the simulation host
//! - `ws`: follower wire protocol and the socket handler
//! - `follower`: the follower's synced view and participant API
//! - `http`, `app`, `config`: the serving binary's surface

pub mod app;
pub mod config;
pub mod follower;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
