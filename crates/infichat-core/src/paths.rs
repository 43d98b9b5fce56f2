//! Path resolution utilities.

use crate::env::{self, vars};
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the infichat base directory (~/.infichat).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".infichat"))
}

/// Get the main config file path.
///
/// Honors `INFICHAT_CONFIG`, falling back to `~/.infichat/infichat.json5`.
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(vars::INFICHAT_CONFIG) {
        return Ok(PathBuf::from(path));
    }
    Ok(base_dir()?.join("infichat.json5"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir_name() {
        let dir = base_dir().unwrap();
        assert!(dir.ends_with(".infichat"));
    }
}
