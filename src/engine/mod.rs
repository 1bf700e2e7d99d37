//! Command-line front end

pub mod arg_parser;
pub mod handlers;

pub use arg_parser::Cli;
pub use handlers::{RunOpts, handle_run};
