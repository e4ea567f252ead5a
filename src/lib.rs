pub mod agent;
pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod orchestration;
