pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod models;
pub mod navigation;
pub mod resolver;
pub mod store;

pub use error::{Error, Result};
