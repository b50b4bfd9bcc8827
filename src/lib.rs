//! Library crate for prompt-quiz-back, exposing modules for the binary and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod providers;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod state;
