//! Terminal chat client built around a merged, paginated message timeline.

pub mod app;
pub mod channel_view;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod timeline;
pub mod utils;

#[cfg(test)]
mod testing;
