pub mod handlers;
pub mod models;
pub mod service;
pub mod spans;
pub mod workflow;
