//! Follower side: the synced view, the participant API and the socket client

pub mod client;
pub mod participant;
pub mod view;

pub use client::ClientError;
pub use participant::{ConnectionStatus, Participant};
pub use view::{CrateView, FollowerView};
