pub mod config;
pub mod document;
pub mod handlers;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test;
