pub mod commands;
pub mod modules;

pub use modules::common::error::CleanerError;
pub use modules::common::utils;
pub use modules::orchestrator;
pub use modules::reporter;
pub use modules::scanner;
pub use modules::session;
pub use modules::validator;
