pub mod credential_store;
pub mod error;
pub mod insight_generator;
pub mod postgrest;
pub mod record_store;
