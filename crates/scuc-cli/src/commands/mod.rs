pub mod build;
pub mod config;
pub mod factors;
pub mod solve;
pub mod validate;
