//! Image Service
//!
//! Accepts an uploaded image, fans it out into concurrently resized
//! variants, and streams each encoded variant into object storage while it
//! is being encoded, returning the ordered storage locations.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
