pub mod api;
pub mod broker;
pub mod config;
pub mod console;
pub mod display;
pub mod input;
pub mod operator;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod terminal;
pub mod ticker;
pub mod toggles;
