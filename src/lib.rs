// src/lib.rs

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

// Re-export specific items for convenience
pub use error::AppError;
pub use state::AppState;
