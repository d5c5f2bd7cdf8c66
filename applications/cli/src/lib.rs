/// Aurora CLI - terminal folder player
pub mod command;
pub mod config;
pub mod library;
pub mod session;

pub use command::{Command, CommandError, HELP};
pub use config::{AppConfig, OutputSettings};
pub use session::{execute, Flow};
