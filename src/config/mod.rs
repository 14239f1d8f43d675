mod defaults;
mod env;
mod io;
mod schema;
mod validate;

pub use io::load_config;
pub use schema::{Config, LoggingConfig, NotifyConfig};
pub use validate::ConfigError;
