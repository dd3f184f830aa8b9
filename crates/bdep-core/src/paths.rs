use dirs::home_dir;
use std::path::PathBuf;

/// Returns the bdep home directory, or None if the user's home cannot be resolved.
///
/// `BDEP_HOME` overrides the default of `~/.bdep`.
pub fn try_bdep_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("BDEP_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".bdep"))
}

/// Engine configuration file: ~/.bdep/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_bdep_home().map(|home| home.join("config.toml"))
}

/// Default universe snapshot: ~/.bdep/universe.json
pub fn universe_path() -> Option<PathBuf> {
    try_bdep_home().map(|home| home.join("universe.json"))
}
