//! PostgreSQL persistence for plansmith: connection pooling, embedded
//! migrations, and the project record store.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
