//! visitlog - A small visitor logging service
//!
//! Every call to `/get_ip` appends one visit record to an append-only
//! JSON-lines journal. Recent records can be browsed as JSON or exported
//! as CSV, and visitor IPs are enriched with country / city / org data
//! from an external GeoIP service behind a persistent lookup cache.
//!
//! # Architecture
//! - `journal`: Append-only visit journal (JSON lines)
//! - `services`: GeoIP provider + cache, query / export projections
//! - `api`: HTTP handlers and middleware
//! - `config`: Configuration management (TOML + env)
//! - `runtime`: Application lifecycle and the server mode
//! - `system`: Logging initialization

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod journal;
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
