// src/handlers/mod.rs

pub mod auth;
pub mod generation;
pub mod plans;
