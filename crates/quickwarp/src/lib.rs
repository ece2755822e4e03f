use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config;
pub mod controller;
pub mod host;
pub mod loader;
pub mod store;
pub mod transition;
pub mod types;

#[cfg(test)]
mod test_host;

pub use config::{
    default_config_text, parse_config_text, read_or_create, ConfigError, ConfigWarning,
    TriggerKey, UnknownKey, WarpConfig, DEFAULT_DEBOUNCE,
};
pub use controller::{CaptureError, WarpController, WarpOutcome, WarpRejection};
pub use host::{
    EntityHandle, EntityHost, EntityLocator, Host, HostError, HostResult, LoadMode, SceneHost,
};
pub use loader::{
    build_arguments, classify_name, discover, select_candidate, ArgValue, Binding, CallTarget,
    DiscoveredLoader, HostType, InstanceId, InvokeError, LoaderCache, LoaderHandle,
    LoaderOverride, LoaderTier, MemberKind, MethodDesc, ParamShape, StaticMember,
};
pub use store::{JsonWarpStore, MemoryWarpStore, StoreError, WarpStore};
pub use transition::{
    RestoreError, RestoreOutcome, RestoreSequencer, SceneSwitcher, Step, Strategy,
    TransitionError, TransitionOutcome, TransitionPhase, TransitionTimeouts,
};
pub use types::{Vec2, Vec3, WarpPoint};

pub const CONFIG_DIR_ENV_VAR: &str = "QUICKWARP_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "QuickWarp.cfg";
pub const DATA_FILE_NAME: &str = "QuickWarp_data.json";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create config directory at {path}: {source}")]
    CreateConfigDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_file: PathBuf,
}

impl ConfigPaths {
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            data_file: config_dir.join(DATA_FILE_NAME),
            config_dir,
        }
    }
}

/// Resolves where the config and saved point live, creating the directory.
pub fn resolve_config_paths() -> Result<ConfigPaths, StartupError> {
    let paths = ConfigPaths::in_dir(resolve_config_dir()?);
    fs::create_dir_all(&paths.config_dir).map_err(|source| StartupError::CreateConfigDir {
        path: paths.config_dir.clone(),
        source,
    })?;
    Ok(paths)
}

fn resolve_config_dir() -> Result<PathBuf, StartupError> {
    match env::var(CONFIG_DIR_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => Ok(normalize_path(Path::new(value.trim()))),
        Ok(_) | Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            Ok(normalize_path(&exe_dir).join("config"))
        }
        Err(source) => Err(StartupError::EnvVar {
            var: CONFIG_DIR_ENV_VAR,
            source,
        }),
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
