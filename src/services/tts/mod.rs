pub mod error;
pub mod health;
pub mod models;
pub mod sovits;
