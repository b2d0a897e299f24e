pub mod cache;
pub mod common;
pub mod cooldown;
pub mod orchestrator;
pub mod reporter;
pub mod scanner;
pub mod session;
pub mod validator;
