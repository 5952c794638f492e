// src/models/mod.rs

pub mod generation;
pub mod plan;
pub mod submission;
pub mod user;
