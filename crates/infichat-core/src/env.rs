//! Environment variable handling.

use std::env;
use std::path::Path;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load environment variables from a .env file in the working directory.
///
/// Variables already present in the environment are left untouched.
pub fn load_dotenv() -> Result<(), std::io::Error> {
    load_dotenv_from(Path::new(".env"))
}

/// Load environment variables from the given file. A missing file is not an
/// error; a file that exists but cannot be read is.
pub fn load_dotenv_from(path: &Path) -> Result<(), std::io::Error> {
    if !path.exists() {
        return Ok(());
    }

    let content = std::fs::read_to_string(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();

            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);

            if env::var(key).is_err() {
                env::set_var(key, value);
            }
        }
    }
    Ok(())
}

/// Environment variable names read by infichat.
pub mod vars {
    /// Access credential for the Supermemory proxy and memory API.
    pub const SUPERMEMORY_API_KEY: &str = "SUPERMEMORY_API_KEY";

    /// Access credential for the upstream Anthropic API.
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

    /// Config file override.
    pub const INFICHAT_CONFIG: &str = "INFICHAT_CONFIG";

    /// Log filter override.
    pub const INFICHAT_LOG: &str = "INFICHAT_LOG";
}
