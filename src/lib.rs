pub mod config;

pub use config::{ConfigError, ErrorKind, FlatConfigReader};
