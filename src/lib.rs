//! Recipe catalog backend with cached recipe expansion and a live chat relay.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod hub;
pub mod infra;
