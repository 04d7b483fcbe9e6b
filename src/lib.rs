//! Commentary - a threaded comments backend
//!
//! Anonymous and authenticated comments with CAPTCHA, replies and likes,
//! JWT user accounts, image and text attachments, and built-in analytics.
//!
//! # Architecture
//! - `api`: HTTP handlers, routes and middleware
//! - `services`: business logic (comments, users, files, captcha, health)
//! - `analytics`: event tracking, rollups, retention and reports
//! - `storage`: sea-orm backed persistence
//! - `config`: configuration management
//! - `runtime`: application lifecycle and server mode
//! - `cli`: one-shot maintenance commands
//! - `system`: logging and panic handling

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
