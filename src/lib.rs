pub mod app;
pub mod audit;
pub mod config;
pub mod driver;
pub mod engine;
pub mod responder;
pub mod shared;
pub mod store;
