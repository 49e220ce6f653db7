/*!
 * Lifecycle Kernel - Main Entry Point
 *
 * Runs the lifecycle manager over a tokio host:
 * - Tracks a small demo workload created through the ambient slot
 * - Logs periodic diagnostics
 * - Tears everything down on Ctrl+C and prints the final report
 */

use lifecycle_kernel::{
    init_tracing, Ambient, Component, Event, Handler, HookResult, LifecycleError,
    LifecycleManager, ManagerConfig, MemoryProbe, ProcMemoryProbe, RuntimeHost, Target,
};
use miette::{IntoDiagnostic, WrapErr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Demo component with a cache the emergency tier can drop
#[derive(Default)]
struct HistoryPanel {
    cached_entries: AtomicU64,
}

impl Component for HistoryPanel {
    fn clear_cache(&self) -> Option<HookResult> {
        let dropped = self.cached_entries.swap(0, Ordering::Relaxed);
        info!(dropped, "history panel cache cleared");
        Some(Ok(()))
    }

    fn destroy(&self) -> Option<HookResult> {
        info!("history panel destroyed");
        Some(Ok(()))
    }
}

fn load_config() -> miette::Result<ManagerConfig> {
    match std::env::var("LIFECYCLE_CONFIG") {
        Ok(path) => {
            let contents = std::fs::read_to_string(&path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading config {}", path))?;
            Ok(ManagerConfig::from_json_str(&contents)?)
        }
        Err(_) => Ok(ManagerConfig::default()),
    }
}

fn start_workload(ambient: &Ambient, panel: &Arc<HistoryPanel>, window: &Target) {
    let beats = Arc::new(AtomicU64::new(0));
    let cache = panel.clone();
    ambient.schedule_repeating(5_000, move || {
        let n = beats.fetch_add(1, Ordering::Relaxed) + 1;
        cache.cached_entries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(n, "heartbeat");
    });

    ambient.schedule_once(1_000, || info!("warm-up complete"));

    let on_resize = Handler::labeled("on_window_resize", |event: &Event| {
        info!(window = %event.target, "resize");
    });
    ambient.add_listener(window, "resize", &on_resize);
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();

    info!("Lifecycle kernel starting...");

    let config = load_config()?;
    let host = Arc::new(RuntimeHost::current().map_err(LifecycleError::from)?);
    let ambient = Ambient::new(host.clone());
    let window = Target::window(0);

    let mut builder = LifecycleManager::builder(ambient.clone()).with_unload_target(window.clone());
    let probe = ProcMemoryProbe::new();
    if probe.is_supported() {
        builder = builder.with_memory_probe(Arc::new(probe) as Arc<dyn MemoryProbe>);
    } else {
        warn!("Memory telemetry unavailable on this platform");
    }
    let manager = builder.build();

    let panel = Arc::new(HistoryPanel::default());
    manager.register_component("history", panel.clone())?;
    manager.init(config)?;

    start_workload(&ambient, &panel, &window);
    info!(
        tracked = manager.counts().total(),
        "Workload started; press Ctrl+C to tear down"
    );

    let mut reports = tokio::time::interval(REPORT_INTERVAL);
    reports.tick().await;
    loop {
        tokio::select! {
            _ = reports.tick() => {
                let report = manager.report();
                info!(
                    timers = report.counts.timers,
                    listeners = report.counts.listeners,
                    observers = report.counts.observers,
                    components = report.counts.components,
                    "diagnostics"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal.into_diagnostic().wrap_err("waiting for Ctrl+C")?;
                break;
            }
        }
    }

    info!("Shutting down...");
    host.dispatch(&window, lifecycle_kernel::core::limits::UNLOAD_EVENT);
    if let Some(result) = manager.destroy() {
        warn!("Unload binding did not run teardown: {}", result);
    }

    println!("{}", manager.report().to_json()?);
    Ok(())
}
