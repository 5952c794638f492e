// src/db/mod.rs

pub mod content_store;
pub mod resolver;

pub use content_store::PgContentStore;
pub use resolver::PgOwnerResolver;
