use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::loader::LoaderOverride;
use crate::store::atomic_io::write_text_atomic;
use crate::transition::{TransitionTimeouts, RESTORE_TIMEOUT};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl TriggerKey {
    pub const ALL: [TriggerKey; 12] = [
        TriggerKey::F1,
        TriggerKey::F2,
        TriggerKey::F3,
        TriggerKey::F4,
        TriggerKey::F5,
        TriggerKey::F6,
        TriggerKey::F7,
        TriggerKey::F8,
        TriggerKey::F9,
        TriggerKey::F10,
        TriggerKey::F11,
        TriggerKey::F12,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TriggerKey::F1 => "F1",
            TriggerKey::F2 => "F2",
            TriggerKey::F3 => "F3",
            TriggerKey::F4 => "F4",
            TriggerKey::F5 => "F5",
            TriggerKey::F6 => "F6",
            TriggerKey::F7 => "F7",
            TriggerKey::F8 => "F8",
            TriggerKey::F9 => "F9",
            TriggerKey::F10 => "F10",
            TriggerKey::F11 => "F11",
            TriggerKey::F12 => "F12",
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for TriggerKey {
    type Err = UnknownKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(raw))
            .ok_or_else(|| UnknownKey(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarpConfig {
    pub capture_key: TriggerKey,
    pub warp_key: TriggerKey,
    pub debounce: Duration,
    pub timeouts: TransitionTimeouts,
    /// How long to wait for an active controllable entity after arriving.
    pub restore_timeout: Duration,
    pub loader_override: Option<LoaderOverride>,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            capture_key: TriggerKey::F6,
            warp_key: TriggerKey::F7,
            debounce: DEFAULT_DEBOUNCE,
            timeouts: TransitionTimeouts::default(),
            restore_timeout: RESTORE_TIMEOUT,
            loader_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write default config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parses `key = value` lines. Bad values keep their default and produce a
/// warning instead of failing the whole file.
pub fn parse_config_text(raw: &str) -> (WarpConfig, Vec<ConfigWarning>) {
    let mut config = WarpConfig::default();
    let mut warnings = Vec::new();

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if let Err(message) = apply_entry(&mut config, key, value) {
            warnings.push(ConfigWarning {
                line: line_number,
                message,
            });
        }
    }

    (config, warnings)
}

fn apply_entry(config: &mut WarpConfig, key: &str, value: &str) -> Result<(), String> {
    match key.to_ascii_lowercase().as_str() {
        "savewarpkey" => config.capture_key = parse_key(key, value)?,
        "loadwarpkey" => config.warp_key = parse_key(key, value)?,
        "debounceseconds" => config.debounce = parse_seconds(key, value)?,
        "loaderwaitseconds" => config.timeouts.loader = parse_seconds(key, value)?,
        "asyncwaitseconds" => config.timeouts.async_single = parse_seconds(key, value)?,
        "additivewaitseconds" => config.timeouts.additive = parse_seconds(key, value)?,
        "playerfindseconds" => config.restore_timeout = parse_seconds(key, value)?,
        "loader" if value.is_empty() => config.loader_override = None,
        "loader" => {
            config.loader_override = Some(
                LoaderOverride::parse(value)
                    .ok_or_else(|| format!("{key}: expected Type.Method, got '{value}'"))?,
            );
        }
        _ => return Err(format!("unknown key '{key}'")),
    }
    Ok(())
}

fn parse_key(key: &str, value: &str) -> Result<TriggerKey, String> {
    value.parse().map_err(|error| format!("{key}: {error}"))
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("{key}: expected seconds, got '{value}'"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("{key}: expected non-negative seconds, got '{value}'"))
}

pub fn default_config_text() -> String {
    let defaults = WarpConfig::default();
    format!(
        "# QuickWarp configuration\n\
         # Keys accept F1-F12.\n\
         saveWarpKey = {}\n\
         loadWarpKey = {}\n\
         debounceSeconds = {}\n\
         \n\
         # Per-strategy scene switch timeouts.\n\
         loaderWaitSeconds = {}\n\
         asyncWaitSeconds = {}\n\
         additiveWaitSeconds = {}\n\
         playerFindSeconds = {}\n\
         \n\
         # Explicit scene loader entry point, e.g. GameManager.BeginSceneTransition\n\
         # loader =\n",
        defaults.capture_key,
        defaults.warp_key,
        defaults.debounce.as_secs_f64(),
        defaults.timeouts.loader.as_secs_f64(),
        defaults.timeouts.async_single.as_secs_f64(),
        defaults.timeouts.additive.as_secs_f64(),
        defaults.restore_timeout.as_secs_f64(),
    )
}

/// Loads the config at `path`, writing a default file first when none exists.
pub fn read_or_create(path: &Path) -> Result<WarpConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            let text = default_config_text();
            write_text_atomic(path, &text).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "config_created");
            text
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let (config, warnings) = parse_config_text(&raw);
    for warning in &warnings {
        warn!(
            path = %path.display(),
            line = warning.line,
            message = %warning.message,
            "config_entry_ignored"
        );
    }
    info!(
        capture_key = %config.capture_key,
        warp_key = %config.warp_key,
        loader_override = config.loader_override.as_ref().map(ToString::to_string).as_deref(),
        "config_loaded"
    );
    Ok(config)
}
