pub mod bootstrap;
pub mod commands;
pub mod console;
pub mod scheduler;
