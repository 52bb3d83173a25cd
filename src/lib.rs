//! Shortener - a content-addressed URL shortener
//!
//! Long URLs map to 8-character keys derived from the URL bytes, so the same
//! URL always yields the same key. Records carry an owner and a soft-delete
//! flag; owners can bulk-delete their links through a concurrent,
//! ownership-verified pipeline.
//!
//! # Architecture
//! - `storage`: the `Storage` contract and its memory, file and SeaORM backends
//! - `services`: validation, idempotent creation, batches, listings, deletion
//! - `utils`: key derivation, URL validation, deadlines, the worker pool
//! - `config`: static configuration (TOML + environment)
//! - `interfaces`: the command-line front end
//! - `system`: logging setup

pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
