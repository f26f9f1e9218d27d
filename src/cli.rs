//! Pieces shared by the command-line tools.

use crate::config::{
    mask_secret, resolve_access_keys, Config, EnvVar, Resolved, JIMENG_ACCESS_KEY_ID,
    JIMENG_SECRET_ACCESS_KEY,
};
use crate::download::download_artifact;
use crate::error::{MediaError, Result};
use crate::task::Task;
use crate::volc_sign::AccessKeys;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// Installs the stderr log subscriber. `verbose` raises the level to DEBUG.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `output_<YYYYMMDD_HHMMSS>.<ext>` in the working directory.
pub fn default_output_path(ext: &str) -> PathBuf {
    output_path_at(Local::now(), ext)
}

fn output_path_at(now: DateTime<Local>, ext: &str) -> PathBuf {
    PathBuf::from(format!("output_{}.{}", now.format("%Y%m%d_%H%M%S"), ext))
}

/// `photo.png` → `photo_2.png`. Used when one call yields several files.
pub fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(name)
}

/// Downloads the artifact of a finished task to `output`.
pub async fn save_artifact(task: &Task, output: &Path) -> Result<u64> {
    let url = task
        .result
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| MediaError::MissingArtifact {
            task_id: task.id.clone(),
        })?;
    info!(task_id = %task.id, "downloading artifact");
    download_artifact(url, output).await
}

/// One line of `config show` output.
pub fn describe_credential(label: &str, resolved: Option<&Resolved>) -> String {
    match resolved {
        Some(resolved) => format!(
            "{}: {} (source: {})",
            label,
            mask_secret(&resolved.value),
            resolved.source
        ),
        None => format!("{}: not configured", label),
    }
}

/// Loads the config at `path` (empty if absent), applies `update` and saves it.
pub fn update_config(path: &Path, update: impl FnOnce(&mut Config)) -> Result<()> {
    let mut config = Config::load_or_default(path)?;
    update(&mut config);
    config.save(path)
}

/// The error for a tool started without credentials.
pub fn missing_credentials(service: &'static str, env_hint: &str, config_hint: &str) -> MediaError {
    MediaError::MissingCredentials {
        service,
        hint: format!(
            "Option 1: export {}\n  Option 2: {}",
            env_hint, config_hint
        ),
    }
}

fn jimeng_key_pair(config: &Config) -> (Option<Resolved>, Option<Resolved>) {
    resolve_access_keys(
        &EnvVar::read(JIMENG_ACCESS_KEY_ID),
        &EnvVar::read(JIMENG_SECRET_ACCESS_KEY),
        config.jimeng.as_ref(),
    )
}

/// Resolves the Jimeng access keys, naming `tool` in the hint when they are missing.
pub fn jimeng_access_keys(config: &Config, tool: &str) -> Result<AccessKeys> {
    match jimeng_key_pair(config) {
        (Some(ak), Some(sk)) => Ok(AccessKeys {
            access_key_id: ak.value,
            secret_access_key: sk.value,
        }),
        _ => Err(missing_credentials(
            "Jimeng",
            "JIMENG_ACCESS_KEY_ID=<AK> && export JIMENG_SECRET_ACCESS_KEY=<SK>",
            &format!("{} config set-keys <ACCESS_KEY_ID> <SECRET_ACCESS_KEY>", tool),
        )),
    }
}

/// The `config show` lines for the Jimeng access keys.
pub fn describe_jimeng_keys(config: &Config) -> Vec<String> {
    match jimeng_key_pair(config) {
        (None, None) => vec!["Jimeng: not configured".to_string()],
        (ak, sk) => vec![
            describe_credential("Jimeng AccessKeyID", ak.as_ref()),
            describe_credential("Jimeng SecretAccessKey", sk.as_ref()),
        ],
    }
}
