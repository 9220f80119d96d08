//! HTTP surface: health, host listing and the follower socket

pub mod routes;

pub use routes::build_router;
