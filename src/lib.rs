pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod services;
pub mod state;
pub mod types;
pub mod validation;
