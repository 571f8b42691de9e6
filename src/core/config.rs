//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::actor::{Actor, Role};
use crate::core::Workspace;

/// Default number of rows per page in list output
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound for a client-requested page size
pub const MAX_PAGE_SIZE: usize = 100;

/// pxo configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Username recorded as creator of new rows
    pub user: Option<String>,

    /// Usernames holding the admin role
    pub admins: Vec<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Database path override (relative paths resolve against the workspace root)
    pub database: Option<PathBuf>,

    /// Rows per page for paginated listings
    pub page_size: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/pxo/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.pxo/config.yaml)
        if let Some(ws) = workspace {
            if let Some(local) = Self::read_file(&ws.config_path()) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Ok(user) = std::env::var("PXO_USER") {
            config.user = Some(user);
        }
        if let Ok(db) = std::env::var("PXO_DB") {
            config.database = Some(PathBuf::from(db));
        }

        config
    }

    /// Parse a config document, ignoring it entirely if malformed
    pub fn from_yaml(contents: &str) -> Option<Self> {
        let has_content = contents.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#') && line != "---"
        });
        if !has_content {
            return Some(Config::default());
        }
        match serde_yml::from_str::<Config>(contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring malformed config: {}", e);
                None
            }
        }
    }

    fn read_file(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        tracing::debug!("loaded config from {}", path.display());
        Self::from_yaml(&contents)
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pxo")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        for admin in other.admins {
            if !self.admins.contains(&admin) {
                self.admins.push(admin);
            }
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
    }

    /// Get the username, falling back to git config or the login name
    pub fn user(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Build the acting identity; `override_user` comes from `--as`
    pub fn actor(&self, override_user: Option<&str>) -> Actor {
        let username = override_user
            .map(str::to_string)
            .unwrap_or_else(|| self.user());
        let role = if self.admins.iter().any(|a| a == &username) {
            Role::Admin
        } else {
            Role::Member
        };
        Actor::new(username, role)
    }

    /// Resolve the database location for a workspace
    pub fn database_path(&self, workspace: &Workspace) -> PathBuf {
        match self.database {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => workspace.root().join(path),
            None => workspace.store_path(),
        }
    }

    /// Page size clamped to the allowed range
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config::from_yaml("user: alice\nadmins: [root]\npage_size: 20\n").unwrap();
        let local = Config::from_yaml("user: bob\nadmins: [ops, root]\n").unwrap();
        base.merge(local);

        assert_eq!(base.user.as_deref(), Some("bob"));
        assert_eq!(base.admins, vec!["root".to_string(), "ops".to_string()]);
        assert_eq!(base.page_size, Some(20));
    }

    #[test]
    fn test_malformed_yaml_is_ignored() {
        assert!(Config::from_yaml("admins: {not: [a list").is_none());
    }

    #[test]
    fn test_comment_only_config_is_default() {
        let fresh = tempfile::TempDir::new().unwrap();
        let ws = Workspace::init(fresh.path()).unwrap();
        let contents = std::fs::read_to_string(ws.config_path()).unwrap();

        let config = Config::from_yaml(&contents).unwrap();
        assert!(config.user.is_none());
        assert!(config.admins.is_empty());
        assert!(Config::from_yaml("").is_some());
        assert!(Config::from_yaml("---\n# nothing\n").is_some());
    }

    #[test]
    fn test_actor_role_from_admin_list() {
        let config = Config::from_yaml("user: alice\nadmins: [root]\n").unwrap();

        let actor = config.actor(None);
        assert_eq!(actor.username, "alice");
        assert_eq!(actor.role, Role::Member);

        let admin = config.actor(Some("root"));
        assert!(admin.is_admin());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let config = Config::default();
        assert_eq!(config.page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(config.page_size(Some(500)), MAX_PAGE_SIZE);
        assert_eq!(config.page_size(Some(0)), 1);
    }
}
