//! YAML-backed configuration trees whose strings render as templates on demand.
//!
//! Keep long prompts and other prose out of source code: [`load`] a file,
//! read and edit it as a tree of [`ConfigNode`]s, [`render`](TemplateValue::render)
//! leaf strings with the variables at hand, and [`dump`] it back.
//!
//! ```no_run
//! use serde_json::json;
//!
//! let mut prompts = konfigure::load("prompts.yaml");
//! if let Some(system) = prompts.template("system") {
//!     println!("{}", system.render(&json!({"assistant": "Konf"}))?);
//! }
//! prompts.set("greeting", "Hi {{ user }}!");
//! konfigure::dump(&prompts, None)?;
//! # Ok::<(), konfigure::Error>(())
//! ```

pub mod config;
mod error;
pub mod template;

pub use config::{dump, dump_with_format, load, load_with_format};
pub use config::{ConfigError, ConfigNode, Format, Value};
pub use error::Error;
pub use template::{RenderOptions, TemplateError, TemplateValue};
