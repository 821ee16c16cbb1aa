pub mod engine;
pub mod local;
