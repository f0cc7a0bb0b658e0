pub mod client;
pub mod config;
pub mod wire;

pub use client::HttpAuthority;
pub use config::HttpAuthorityConfig;
