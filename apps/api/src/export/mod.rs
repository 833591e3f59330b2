pub mod builder;
pub mod handlers;
pub mod models;
pub mod render;
pub mod service;
pub mod vocabulary;
