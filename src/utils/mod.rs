pub mod fs;
pub mod ip;

pub use fs::atomic_write;
pub use ip::{IpClass, classify_ip, extract_client_ip};
