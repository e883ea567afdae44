#![forbid(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod env_file;
pub mod fetch;
pub mod formats;
pub mod fsutil;
pub mod http;
pub mod logging;
pub mod mal;
pub mod notion;
pub mod snapshot;
pub mod sync;
