mod server;

pub use server::{ConfigFile, ServerConfig};
