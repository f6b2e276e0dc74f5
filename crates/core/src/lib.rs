pub mod config;
pub mod error;
pub mod keypath;
pub mod model;
pub mod query;
pub mod record;
pub mod stream;
pub mod time;

pub use error::{IclogsError, Result};
