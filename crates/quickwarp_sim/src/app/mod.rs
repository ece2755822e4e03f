mod bootstrap;
mod loop_runner;
mod script;
mod sim_host;

use std::process::ExitCode;

use quickwarp::SceneHost;

use tracing::{error, info, warn};

pub(crate) fn run() -> ExitCode {
    let bootstrap::AppWiring {
        config,
        keys,
        mut controller,
        mut host,
        script,
    } = match bootstrap::build_app() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let report = loop_runner::run_session(&config, keys, &mut controller, &mut host, &script);
    info!(
        scene = host.active_scene().unwrap_or("<none>"),
        x = host.player().position.x,
        y = host.player().position.y,
        physics_syncs = host.physics_syncs(),
        "sim_host_final_state"
    );
    if report.all_warps_succeeded() {
        info!(warps = report.outcomes.len(), "all_warps_succeeded");
        ExitCode::SUCCESS
    } else {
        warn!(
            warps = report.outcomes.len(),
            failed = report
                .outcomes
                .iter()
                .filter(|outcome| !outcome.succeeded())
                .count(),
            "warps_failed"
        );
        ExitCode::FAILURE
    }
}
