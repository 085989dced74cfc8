//! Batchscreen - bulk sanctions-list screening against a remote search service

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod outcome;
pub mod rows;

pub use config::ScreenConfig;
pub use error::{Result, ScreenError};
