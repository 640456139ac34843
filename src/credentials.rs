//! Token lookup for when no token is passed to the builder.
//!
//! The OpenRobot CLI stores its token in `~/.openrobot/api/cridentials.json`
//! as `{"token": "..."}`. If that file is missing or unusable the
//! `OPENROBOT_API_TOKEN` environment variable is used instead.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when the credentials file has no token.
pub const TOKEN_ENV_VAR: &str = "OPENROBOT_API_TOKEN";

/// Directory under the home directory where the CLI keeps its state.
const CONFIG_DIR: &str = ".openrobot";
// The misspelling is the file name the CLI actually writes.
const CREDENTIALS_FILE: &str = "cridentials.json";

#[derive(Deserialize)]
struct Credentials {
    token: String,
}

/// Returns the credentials file path, if the home directory is known.
pub fn credentials_path() -> Option<PathBuf> {
    Some(
        dirs::home_dir()?
            .join(CONFIG_DIR)
            .join("api")
            .join(CREDENTIALS_FILE),
    )
}

/// Resolves a token from the credentials file, then the environment.
pub fn resolve_token() -> Option<String> {
    resolve_token_from(
        credentials_path().as_deref(),
        std::env::var(TOKEN_ENV_VAR).ok(),
    )
}

/// Resolves a token from an explicit file path and environment value.
///
/// Empty tokens are treated as absent.
pub fn resolve_token_from(path: Option<&Path>, env: Option<String>) -> Option<String> {
    path.and_then(read_token)
        .or_else(|| env.filter(|token| !token.is_empty()))
}

fn read_token(path: &Path) -> Option<String> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No credentials file");
            return None;
        }
    };

    match serde_json::from_str::<Credentials>(&data) {
        Ok(credentials) if !credentials.token.is_empty() => Some(credentials.token),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring malformed credentials file"
            );
            None
        }
    }
}
