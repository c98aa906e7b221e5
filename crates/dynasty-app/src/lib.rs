// Command-line front end: argument parsing, command execution and CSV export.

pub mod cli;
pub mod commands;
pub mod export;
