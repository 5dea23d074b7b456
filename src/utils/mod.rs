/// Shared helpers: process execution, polling, preflight checks, templating
pub mod checks;
pub mod command;
pub mod polling;
pub mod template;
