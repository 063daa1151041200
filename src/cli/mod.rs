//! CLI module - command-line interface
//!
//! Contains the REPL, command parsing and the terminal conversation printer.

pub mod commands;
pub mod printer;
pub mod repl;

pub use printer::TerminalLogger;
pub use repl::Repl;
