use quickwarp::{
    read_or_create, resolve_config_paths, ConfigError, ConfigPaths, JsonWarpStore, StartupError,
    WarpController,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::{LoopConfig, SessionKeys};
use super::script::{demo_script, Script};
use super::sim_host::{SimHost, SimSettings};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) keys: SessionKeys,
    pub(crate) controller: WarpController<JsonWarpStore>,
    pub(crate) host: SimHost,
    pub(crate) script: Script,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== QuickWarp Sim Startup ===");

    let paths = resolve_config_paths()?;
    wire_app(&paths)
}

fn wire_app(paths: &ConfigPaths) -> Result<AppWiring, AppError> {
    info!(
        config_file = %paths.config_file.display(),
        data_file = %paths.data_file.display(),
        "config_paths_resolved"
    );
    let warp_config = read_or_create(&paths.config_file)?;
    let keys = SessionKeys {
        capture: warp_config.capture_key,
        warp: warp_config.warp_key,
    };
    let controller = WarpController::new(&warp_config, JsonWarpStore::new(&paths.data_file));

    Ok(AppWiring {
        config: LoopConfig::default(),
        keys,
        controller,
        host: SimHost::demo(SimSettings::default()),
        script: demo_script(keys.capture, keys.warp),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
