// src/models/mod.rs

pub mod category;
pub mod generation;
pub mod paper;
pub mod question;
