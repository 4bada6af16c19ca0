// Library exports for linkdeck
// The binary and the integration tests both build on these modules

pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod interactions;
pub mod mirror;
pub mod models;
pub mod session;
pub mod state;
pub mod thread;
pub mod views;

#[cfg(test)]
mod testing;
