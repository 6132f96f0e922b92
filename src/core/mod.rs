// src/core/mod.rs
//! Configuration and persistence shared by the API server and the admin CLI

pub mod config_manager;
pub mod database;

pub use config_manager::ConfigManager;
pub use database::{
    AnalysisRepository, ChargedAnalysis, DatabaseConfig, UserRepository, UserService,
};
