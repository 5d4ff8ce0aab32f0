#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod fetcher;
pub mod filter;
pub mod listing;
pub mod logger;
pub mod presenter;
pub mod resolver;
pub mod storage;
pub mod volume;
pub mod watch;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
