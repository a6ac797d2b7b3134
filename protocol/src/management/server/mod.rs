mod build;
mod config;
mod identity;
mod stats;
mod status;

pub use build::BuildId;
pub use config::ServerConfig;
pub use identity::{ServerFlavor, ServerId, ServerIdentity};
pub use stats::ServerStats;
pub use status::ServerState;
