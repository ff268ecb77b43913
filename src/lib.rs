pub mod action;
pub mod backend;
pub mod cli;
pub mod config;
pub mod core;
pub mod driver;
pub mod engine;
pub mod nlu;
pub mod notify;
pub mod rules;
pub mod session;
pub mod speech;
pub mod state;
pub mod telemetry;
pub mod tier;
pub mod tools;
