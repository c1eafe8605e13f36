use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured database path
pub const DATABASE_ENV: &str = "WORKBOARD_DATABASE";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WorkboardConfig {
    pub database: Option<String>,
    /// Load the demo organization on `init` when the database is empty
    #[serde(default)]
    pub create_demo_data: bool,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("workboard.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".workboard").join("workboard.db")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<WorkboardConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: WorkboardConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &WorkboardConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Pick the database path: explicit flag, then `WORKBOARD_DATABASE`, then
/// the config file, then the default under the current directory
pub fn resolve_database_path(
    cli: Option<&Path>,
    env: Option<String>,
    config: Option<&WorkboardConfig>,
) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Some(path) = env.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(path);
    }
    config
        .and_then(|c| c.database.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| default_database_path_in(Path::new(".")))
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(Some(&dir.path().join("workboard.toml"))).unwrap(), None);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workboard.toml");
        let config = WorkboardConfig {
            database: Some("data/wb.db".into()),
            create_demo_data: true,
        };
        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        assert!(matches!(write_config(&path, &config, false), Err(Error::Config(_))));
        write_config(&path, &config, true).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workboard.toml");
        std::fs::write(&path, "database = [").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolution_order() {
        let config = WorkboardConfig {
            database: Some("from-config.db".into()),
            create_demo_data: false,
        };
        assert_eq!(
            resolve_database_path(Some(Path::new("cli.db")), Some("env.db".into()), Some(&config)),
            PathBuf::from("cli.db")
        );
        assert_eq!(
            resolve_database_path(None, Some("env.db".into()), Some(&config)),
            PathBuf::from("env.db")
        );
        assert_eq!(
            resolve_database_path(None, Some(" ".into()), Some(&config)),
            PathBuf::from("from-config.db")
        );
        assert_eq!(
            resolve_database_path(None, None, None),
            default_database_path_in(Path::new("."))
        );
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("workboard.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
