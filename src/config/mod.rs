pub mod env;
mod loader;

pub use env::{AlertConfig, ApiConfig, AppConfig, DirectoryConfig, FeedConfig};
pub use loader::load_config;
