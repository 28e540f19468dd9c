//! Treeform server library.
//!
//! Stores emitter and platform records as JSON documents and serves them
//! over an authenticated HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod records;
pub mod server;
pub mod store;
