//! Configuration trees and their persistence.

mod error;
mod file;
mod format;
mod node;
mod value;

pub use error::ConfigError;
pub use file::{dump, dump_with_format, load, load_with_format};
pub use format::Format;
pub use node::{ConfigNode, RESERVED_PREFIX};
pub use value::Value;
