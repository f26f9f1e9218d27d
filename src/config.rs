//! The on-disk credential file and environment-first credential resolution.
//!
//! Nothing in this module reads the process environment on its own: callers
//! capture variables with [`EnvVar::read`] and pass them in, so resolution is a
//! plain function of its arguments.

use crate::error::{MediaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const ARK_API_KEY: &str = "ARK_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const TOPVIEW_API_KEY: &str = "TOPVIEW_API_KEY";
pub const TOPVIEW_UID: &str = "TOPVIEW_UID";
pub const JIMENG_ACCESS_KEY_ID: &str = "JIMENG_ACCESS_KEY_ID";
pub const JIMENG_SECRET_ACCESS_KEY: &str = "JIMENG_SECRET_ACCESS_KEY";

/// Credentials stored for one service. Unset fields are omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
}

/// The whole config file, one optional section per service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ServiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ark: Option<ServiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topview: Option<ServiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jimeng: Option<ServiceConfig>,
}

impl Config {
    /// `~/.config/mediagen/config.json`, falling back to the working directory
    /// when no home directory can be determined.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("mediagen")
            .join("config.json")
    }

    /// Reads and parses the config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| MediaError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| MediaError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Config::load`], but a missing file yields an empty config.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(MediaError::ConfigRead { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Writes the config as indented JSON, readable only by the owner on Unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
            set_mode(dir, 0o700)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        set_mode(path, 0o600)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// A captured environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: &'static str,
    pub value: Option<String>,
}

impl EnvVar {
    /// Captures `name` from the process environment.
    pub fn read(name: &'static str) -> Self {
        Self {
            name,
            value: std::env::var(name).ok(),
        }
    }

    pub fn new(name: &'static str, value: Option<&str>) -> Self {
        Self {
            name,
            value: value.map(str::to_string),
        }
    }

    fn non_empty(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env(&'static str),
    ConfigFile,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Env(name) => write!(f, "env {}", name),
            Source::ConfigFile => f.write_str("config file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: Source,
}

/// Picks the environment value if it is set and non-empty, else the file value.
pub fn resolve(env: &EnvVar, from_config: Option<&str>) -> Option<Resolved> {
    if let Some(value) = env.non_empty() {
        return Some(Resolved {
            value: value.to_string(),
            source: Source::Env(env.name),
        });
    }
    from_config.filter(|v| !v.is_empty()).map(|value| Resolved {
        value: value.to_string(),
        source: Source::ConfigFile,
    })
}

pub fn resolve_api_key(env: &EnvVar, service: Option<&ServiceConfig>) -> Option<Resolved> {
    resolve(env, service.map(|s| s.api_key.as_str()))
}

pub fn resolve_uid(env: &EnvVar, service: Option<&ServiceConfig>) -> Option<Resolved> {
    resolve(env, service.map(|s| s.uid.as_str()))
}

/// Resolves an access-key pair. Each half is resolved independently.
pub fn resolve_access_keys(
    access_key_env: &EnvVar,
    secret_key_env: &EnvVar,
    service: Option<&ServiceConfig>,
) -> (Option<Resolved>, Option<Resolved>) {
    (
        resolve(access_key_env, service.map(|s| s.access_key_id.as_str())),
        resolve(secret_key_env, service.map(|s| s.secret_access_key.as_str())),
    )
}

/// Masks a secret for display, keeping the first and last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ark_section(key: &str) -> ServiceConfig {
        ServiceConfig {
            api_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn env_takes_precedence_over_file() {
        let env = EnvVar::new(ARK_API_KEY, Some("from-env"));
        let resolved = resolve_api_key(&env, Some(&ark_section("from-file"))).unwrap();
        assert_eq!(resolved.value, "from-env");
        assert_eq!(resolved.source, Source::Env(ARK_API_KEY));
        assert_eq!(resolved.source.to_string(), "env ARK_API_KEY");
    }

    #[test]
    fn empty_env_falls_back_to_file() {
        let env = EnvVar::new(ARK_API_KEY, Some(""));
        let resolved = resolve_api_key(&env, Some(&ark_section("from-file"))).unwrap();
        assert_eq!(resolved.value, "from-file");
        assert_eq!(resolved.source, Source::ConfigFile);
    }

    #[test]
    fn nothing_configured() {
        let env = EnvVar::new(ARK_API_KEY, None);
        assert_eq!(resolve_api_key(&env, None), None);
        assert_eq!(resolve_api_key(&env, Some(&ark_section(""))), None);
    }

    #[test]
    fn access_key_halves_resolve_independently() {
        let section = ServiceConfig {
            access_key_id: "ak-file".into(),
            secret_access_key: "sk-file".into(),
            ..Default::default()
        };
        let (ak, sk) = resolve_access_keys(
            &EnvVar::new(JIMENG_ACCESS_KEY_ID, Some("ak-env")),
            &EnvVar::new(JIMENG_SECRET_ACCESS_KEY, None),
            Some(&section),
        );
        assert_eq!(ak.unwrap().value, "ak-env");
        assert_eq!(sk.unwrap().source, Source::ConfigFile);
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret("abcd1234wxyz"), "abcd...wxyz");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn save_and_load_keeps_sections_and_omits_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            ark: Some(ark_section("ark-key")),
            jimeng: Some(ServiceConfig {
                access_key_id: "ak".into(),
                secret_access_key: "sk".into(),
                ..Default::default()
            }),
            ..Default::default()
        };

        config.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({
            "ark": { "api_key": "ark-key" },
            "jimeng": { "access_key_id": "ak", "secret_access_key": "sk" }
        }));
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_as_default_but_garbage_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(Config::load_or_default(&missing).unwrap(), Config::default());
        assert!(matches!(Config::load(&missing), Err(MediaError::ConfigRead { .. })));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(
            Config::load_or_default(&garbage),
            Err(MediaError::ConfigParse { .. })
        ));
    }
}
