#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod carousel;
pub mod collection;
pub mod config;
pub mod data;
pub mod format;
pub mod goodvibes;
pub mod idle;
pub mod leaderboard;
pub mod loader;
pub mod logging;
pub mod playback;
pub mod schedule;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
