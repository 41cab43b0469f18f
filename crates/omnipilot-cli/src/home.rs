use std::path::{Path, PathBuf};

const DEFAULT_CONF_DIR_NAME: &str = ".omnipilot";
pub const CONFIG_FILE_NAME: &str = "omnipilot.toml";
pub const LOG_FILE_NAME: &str = "omnipilot.log";

pub fn resolve_conf_dir(conf_dir: Option<&Path>) -> PathBuf {
    conf_dir
        .map(resolve_conf_dir_arg)
        .unwrap_or_else(default_conf_dir)
}

fn resolve_conf_dir_arg(path: &Path) -> PathBuf {
    let expanded = expand_path_with_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(expanded)
    }
}

fn expand_path_with_home(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw == "~" {
        return home_dir();
    }
    if let Some(suffix) = raw.strip_prefix("~/") {
        return home_dir().join(suffix);
    }
    path.to_path_buf()
}

fn default_conf_dir() -> PathBuf {
    home_dir().join(DEFAULT_CONF_DIR_NAME)
}

fn home_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home);
    }
    if let Some(profile) = std::env::var_os("USERPROFILE") {
        return PathBuf::from(profile);
    }
    PathBuf::from(".")
}
