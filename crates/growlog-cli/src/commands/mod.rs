pub mod auth_cmd;
pub mod calc;
pub mod common;
pub mod completions;
pub mod config;
pub mod log;
pub mod queue;
pub mod sync;
pub mod watch;
