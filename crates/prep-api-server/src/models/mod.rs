pub mod application;
pub mod chat;
pub mod interview;
pub mod tools;
