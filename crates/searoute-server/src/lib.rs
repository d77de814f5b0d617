//! Shared library surface for the searoute server and its tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod loops;
pub mod persistence;
pub mod state;
