use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use kcal_core::models::DEFAULT_ADMIN_USERNAME;

const DEFAULT_ADMIN_PASSWORD: &str = "admin";

pub struct Config {
    pub db_path: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
    /// True when `KCAL_ADMIN_PASSWORD` was absent and the built-in default is in use.
    pub admin_password_defaulted: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "kcal").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Self::resolve(data_dir, |key| std::env::var(key).ok()))
    }

    /// Apply `KCAL_*` overrides from `lookup` on top of the defaults rooted at `data_dir`.
    fn resolve(data_dir: PathBuf, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("KCAL_DATABASE")
            .filter(|v| !v.is_empty())
            .map_or_else(|| data_dir.join("kcal.db"), PathBuf::from);

        let admin_username = lookup("KCAL_ADMIN_USERNAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());

        let configured_password = lookup("KCAL_ADMIN_PASSWORD").filter(|v| !v.is_empty());
        let admin_password_defaulted = configured_password.is_none();
        let admin_password =
            configured_password.unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());

        Config {
            db_path,
            admin_username,
            admin_password,
            admin_password_defaulted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(PathBuf::from("/data/kcal"), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with(&[]);
        assert_eq!(config.db_path, PathBuf::from("/data/kcal/kcal.db"));
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.admin_password, "admin");
        assert!(config.admin_password_defaulted);
    }

    #[test]
    fn test_env_overrides() {
        let config = resolve_with(&[
            ("KCAL_DATABASE", "/tmp/other.db"),
            ("KCAL_ADMIN_USERNAME", "root"),
            ("KCAL_ADMIN_PASSWORD", "s3cret"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.admin_username, "root");
        assert_eq!(config.admin_password, "s3cret");
        assert!(!config.admin_password_defaulted);
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = resolve_with(&[("KCAL_DATABASE", ""), ("KCAL_ADMIN_USERNAME", "")]);
        assert_eq!(config.db_path, PathBuf::from("/data/kcal/kcal.db"));
        assert_eq!(config.admin_username, "admin");
    }
}
