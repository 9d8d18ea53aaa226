//! Types shared by the build notification server and its clients.

pub mod config;
pub mod types;
