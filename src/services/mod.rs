// src/services/mod.rs

pub mod category;
pub mod generator;
pub mod hydrate;
pub mod import;
pub mod paper;
pub mod popular;
pub mod prompt;
pub mod question;
