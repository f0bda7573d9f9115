//! CLI command implementations.

mod complete;
mod config;
mod embed;
mod generate;

pub use complete::run_complete;
pub use config::run_config;
pub use embed::run_embed;
pub use generate::run_generate;
