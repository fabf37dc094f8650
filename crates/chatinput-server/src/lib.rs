//! chatinput-server - line-oriented TCP chat on top of chatinput-core
//!
//! Every connection is a user. On join the server asks for a nickname
//! through the input coordinator; lines that do not answer a prompt are
//! chat or commands (`/nick`, `/feedback`, `/who`, `/quit`).

pub mod config;
pub mod flows;
pub mod host;
pub mod server;

pub use config::Config;
pub use server::ChatServer;
