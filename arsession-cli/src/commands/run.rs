//! Run command - drive a simulated AR session with a live render loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arsession::config::ConfigFile;
use arsession::lifecycle::{InitOutcome, LifecycleController, LifecycleEvent, LifecycleState};
use arsession::render_loop::RenderLoop;
use arsession::scene::{Dimensions, SceneNode};
use arsession::sim::{RecordingRenderer, RenderLog, SimBackend, SimStatsSnapshot};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::load;
use crate::error::CliError;

/// Resize events fired while the viewport "rotates".
const ROTATION_STEPS: u32 = 5;

/// Gap between rotation resize events.
const ROTATION_STEP_INTERVAL: Duration = Duration::from_millis(100);

/// Name of the animated node added to the scene.
const SPINNER_NODE: &str = "spinner";

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub viewport: Dimensions,
    pub duration: Option<u64>,
    pub rotate_after: Option<u64>,
    pub log_level: Option<String>,
}

/// What the run did, printed on exit.
struct RunSummary {
    elapsed: Duration,
    final_state: LifecycleState,
    render: RenderLog,
    stats: SimStatsSnapshot,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load(args.config.as_ref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    let _logging = arsession::logging::init(&config.logging)?;

    println!("ARSession v{}", arsession::VERSION);
    println!("==================");
    println!();
    println!("Source:        {}", config.source.kind);
    println!("Marker:        {}", config.tracker.marker);
    println!("Viewport:      {} ({})", args.viewport, args.viewport.orientation());
    println!("Resize policy: {}", config.lifecycle.resize_policy);
    match config.lifecycle.init_timeout {
        Some(timeout) => println!(
            "Init timeout:  {:?} x {} attempt(s)",
            timeout, config.lifecycle.init_attempts
        ),
        None => println!("Init timeout:  none"),
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, disposing session...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let summary = runtime.block_on(drive(
        config,
        args.viewport,
        args.duration.map(Duration::from_secs),
        args.rotate_after.map(Duration::from_secs),
        shutdown,
    ));

    print_summary(&summary);
    Ok(())
}

/// Run the session until shutdown or the duration elapses.
async fn drive(
    config: ConfigFile,
    viewport: Dimensions,
    duration: Option<Duration>,
    rotate_after: Option<Duration>,
    shutdown: CancellationToken,
) -> RunSummary {
    let started = Instant::now();
    let backend = Arc::new(SimBackend::new(config.sim_config()));
    let stats = backend.stats();
    let controller = LifecycleController::new(config.controller_config(), backend, viewport);
    controller.add_scene_node(SceneNode::new(SPINNER_NODE).with_position([0.0, 0.5, 0.0]));

    let renderer = RecordingRenderer::new();
    let mut render_loop = RenderLoop::new(
        controller.clone(),
        Box::new(renderer.clone()),
        config.render.clone(),
    );
    render_loop.add_hook(|scene, time| {
        if let Some(node) = scene.node_mut(SPINNER_NODE) {
            node.rotation[1] += time.delta.as_secs_f32();
        }
    });

    let mut events = controller.subscribe();
    if let InitOutcome::Started { epoch } = controller.init_ar() {
        info!(epoch, "Session started");
    }

    let render_task = tokio::spawn(render_loop.run());
    let rotation_task = rotate_after.map(|after| spawn_rotation(controller.clone(), after));

    let deadline = async move {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut deadline => {
                info!("Run duration elapsed");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(started, &event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(task) = rotation_task {
        task.abort();
    }
    render_task.abort();
    controller.dispose_ar();

    RunSummary {
        elapsed: started.elapsed(),
        final_state: controller.state(),
        render: renderer.snapshot(),
        stats: stats.snapshot(),
    }
}

/// Rotate the viewport after `after`, as a burst of intermediate sizes.
fn spawn_rotation(controller: LifecycleController, after: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let from = controller.viewport();
        info!(%from, "Rotating viewport");
        for size in rotation_burst(from, ROTATION_STEPS) {
            controller.on_viewport_resize(size);
            tokio::time::sleep(ROTATION_STEP_INTERVAL).await;
        }
    })
}

/// Viewport sizes seen while rotating `from` by 90 degrees, ending swapped.
fn rotation_burst(from: Dimensions, steps: u32) -> Vec<Dimensions> {
    let steps = steps.max(1);
    let lerp = |a: u32, b: u32, i: u32| -> u32 {
        let (a, b) = (a as i64, b as i64);
        (a + (b - a) * i as i64 / steps as i64) as u32
    };
    (1..=steps)
        .map(|i| {
            Dimensions::new(
                lerp(from.width, from.height, i),
                lerp(from.height, from.width, i),
            )
        })
        .collect()
}

fn print_event(started: Instant, event: &LifecycleEvent) {
    println!("[{:>8.3}s] {}", started.elapsed().as_secs_f64(), event);
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    println!();
    println!("Summary");
    println!("-------");
    println!("Ran for:         {:.1}s", summary.elapsed.as_secs_f64());
    println!("Final state:     {}", summary.final_state.display_status());
    println!(
        "Frames:          {} ({} with marker visible)",
        summary.render.frames, summary.render.visible_frames
    );
    println!("Detection steps: {}", stats.context_updates);
    println!(
        "Sessions:        {} source(s), {} context(s), {} tracker(s)",
        stats.sources_created, stats.contexts_created, stats.trackers_created
    );
    let (sources, contexts, trackers) = stats.live();
    if sources + contexts + trackers > 0 {
        println!(
            "Leaked:          {} source(s), {} context(s), {} tracker(s)",
            sources, contexts, trackers
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_burst_ends_swapped() {
        let burst = rotation_burst(Dimensions::new(640, 480), 5);
        assert_eq!(burst.len(), 5);
        assert_eq!(burst[0], Dimensions::new(608, 512));
        assert_eq!(burst[4], Dimensions::new(480, 640));
    }

    #[test]
    fn test_rotation_burst_single_step() {
        let burst = rotation_burst(Dimensions::new(1280, 720), 0);
        assert_eq!(burst, vec![Dimensions::new(720, 1280)]);
    }
}
