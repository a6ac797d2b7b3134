pub mod file;
pub mod scanner;

pub use file::{Config, FileIoWithBackup, ServerConfigStore};
pub use scanner::{identify, scan_servers};
