pub mod auth_cmd;
pub mod console;
pub mod duration_cmd;
pub mod fetch;
pub mod output;
pub mod session;
pub mod watch;
