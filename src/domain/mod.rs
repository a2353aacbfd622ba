pub mod date;
pub mod models;
