//! Distill PDF Conversion Service
//!
//! A Rust service that accepts an uploaded PDF document, runs it through a
//! conversion engine, and returns Markdown plus base64-encoded image assets
//! in a fixed-shape JSON envelope.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
