pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod llm;
pub mod relay;
pub mod server;
