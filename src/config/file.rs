//! Loading configuration trees from files and saving them back.
//!
//! Loading never fails: a missing file is how a new configuration starts, and
//! an unreadable one is logged and replaced by an empty tree. Saving reports
//! environmental failures as `Ok(false)` so a long-running caller is never
//! brought down by a bad disk.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use super::node::strip_reserved;
use super::{ConfigError, ConfigNode, Format};

/// Loads the configuration at `path`, picking the format from its extension.
///
/// The returned root is bound to the absolute form of `path` whether or not
/// the file could be read.
pub fn load(path: impl AsRef<Path>) -> ConfigNode {
    let path = path.as_ref();
    load_with_format(path, Format::from_path(path))
}

pub fn load_with_format(path: impl AsRef<Path>, format: Format) -> ConfigNode {
    let path = resolve_path(path.as_ref());
    match load_config_file(&path, format) {
        Ok(Some(map)) => {
            debug!(path = %path.display(), keys = map.len(), "loaded config");
            ConfigNode::from_map(map).with_file(path)
        }
        Ok(None) => {
            debug!(path = %path.display(), "config file not found, starting empty");
            ConfigNode::new().with_file(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, starting empty");
            ConfigNode::new().with_file(path)
        }
    }
}

/// Saves `node` to `path`, or to the file it is bound to when `path` is
/// `None`. The format follows the target's extension.
///
/// Returns `Err(ConfigError::MissingPath)` if there is nowhere to save to.
/// Any other failure is logged and reported as `Ok(false)`.
pub fn dump(node: &ConfigNode, path: Option<&Path>) -> Result<bool, ConfigError> {
    let target = target_path(node, path)?;
    let format = Format::from_path(&target);
    Ok(save(node, &target, format))
}

pub fn dump_with_format(
    node: &ConfigNode,
    path: Option<&Path>,
    format: Format,
) -> Result<bool, ConfigError> {
    let target = target_path(node, path)?;
    Ok(save(node, &target, format))
}

fn target_path(node: &ConfigNode, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    path.or(node.file_path())
        .map(resolve_path)
        .ok_or(ConfigError::MissingPath)
}

fn save(node: &ConfigNode, path: &Path, format: Format) -> bool {
    match write_config_file(node, path, format) {
        Ok(()) => {
            debug!(path = %path.display(), "saved config");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to save config");
            false
        }
    }
}

/// Reads and parses a config file.
///
/// Returns `Ok(None)` if the file doesn't exist.
fn load_config_file(path: &Path, format: Format) -> Result<Option<Map<String, Json>>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let mut map = format.parse(&contents, path)?;
            strip_reserved(&mut map);
            Ok(Some(map))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_config_file(node: &ConfigNode, path: &Path, format: Format) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    let text = format.serialize(&node.to_serializable(), path)?;
    std::fs::write(path, text).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn resolve_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "could not make path absolute");
        path.to_path_buf()
    })
}
