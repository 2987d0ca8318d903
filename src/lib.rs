pub mod app;
pub mod config;
pub mod error;
pub mod generator;
pub mod session;
pub mod store;
pub mod timer;
