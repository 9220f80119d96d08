//! Follower transport: wire types, binary buffers and the socket handler

pub mod buffer;
pub mod handler;
pub mod protocol;

pub use buffer::F32Buffer;
pub use protocol::{ClientMsg, Command, ServerMsg, Snapshot};
