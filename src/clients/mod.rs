// src/clients/mod.rs

pub mod completion;
