pub mod clock;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod logging;
pub mod utils;
