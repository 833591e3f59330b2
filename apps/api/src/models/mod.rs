pub mod actor;
pub mod annotation;
