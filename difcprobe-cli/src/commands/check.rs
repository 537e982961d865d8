//! `difcprobe check` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use difcprobe_core::config::{DifcProbeConfig, SettleMode};
use difcprobe_core::engine::EngineFactory;
use difcprobe_core::types::ProbeResult;
use difcprobe_engine::LocalEngineFactory;
use difcprobe_probe::{
    CapabilityProbe, ProbeReport, SettleProgress, SettleStrategy, TeardownStatus, TopologyBuilder,
};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Capacity of the settle progress channel.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Execute the `check` command.
///
/// Renders the report first, then maps any non-confirmed outcome to an error
/// so the process exit code reflects the classification.
pub async fn execute(
    args: CheckArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_effective_config(config_path, &args).await?;

    let report = run_probe(&config, LocalEngineFactory::new()).await?;
    let payload = CheckReport::new(report, difcprobe_engine::build_flavor());
    writer.render(&payload)?;

    match CliError::from_probe_result(&payload.report.result) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Load configuration (file or defaults, then env) and apply CLI flags on top.
///
/// Validation runs once on the merged result, so a flag can replace an
/// invalid file or env value.
pub async fn load_effective_config(
    config_path: &Path,
    args: &CheckArgs,
) -> Result<DifcProbeConfig, CliError> {
    let mut config = DifcProbeConfig::load_layered(config_path).await?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Apply command-line flags, which take precedence over file and env values.
pub fn apply_overrides(config: &mut DifcProbeConfig, args: &CheckArgs) {
    if let Some(ref servers) = args.bootstrap_servers {
        config.engine.bootstrap_servers = servers.clone();
    }
    if let Some(ref application_id) = args.application_id {
        config.engine.application_id = application_id.clone();
    }
    if let Some(ref version) = args.expected_version {
        config.probe.expected_version = version.clone();
    }
    if let Some(enabled) = args.expected_enabled {
        config.probe.expected_enabled = enabled;
    }
    if let Some(timeout_ms) = args.settle_timeout_ms {
        config.probe.settle_timeout_ms = timeout_ms;
    }
    if args.fixed_settle {
        config.probe.settle_mode = SettleMode::Fixed;
    }
}

/// Build the inert topology and run one probe cycle with the given factory.
///
/// # Errors
///
/// Returns `CliError::Config` if the configured topic pattern is rejected.
/// Probe failures are not errors here; they are carried in the report.
pub async fn run_probe<F: EngineFactory>(
    config: &DifcProbeConfig,
    factory: F,
) -> Result<ProbeReport, CliError> {
    let descriptor = TopologyBuilder::from_config(&config.probe).try_build()?;

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let progress_task = tokio::spawn(log_progress(progress_rx));

    let probe = CapabilityProbe::new(factory)
        .baseline(config.probe.baseline())
        .settle_strategy(SettleStrategy::from_config(&config.probe))
        .progress_sender(progress_tx);

    let report = probe.run(&descriptor, &config.engine).await;

    // 송신측을 닫아 진행 로그 태스크를 종료
    drop(probe);
    if let Err(e) = progress_task.await {
        debug!(error = %e, "progress logger task failed");
    }

    Ok(report)
}

async fn log_progress(mut rx: mpsc::Receiver<SettleProgress>) {
    while let Some(event) = rx.recv().await {
        match event {
            SettleProgress::Polled {
                attempt,
                state,
                elapsed,
            } => debug!(
                attempt,
                %state,
                elapsed_ms = elapsed.as_millis() as u64,
                "waiting for engine"
            ),
            SettleProgress::Waited { elapsed } => {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "fixed settle wait done")
            }
            SettleProgress::Settled { state, elapsed } => info!(
                %state,
                elapsed_ms = elapsed.as_millis() as u64,
                "engine settled"
            ),
        }
    }
}

/// Check command output.
#[derive(Serialize)]
pub struct CheckReport {
    /// Which reference engine build ran the probe (`standard` or `difc`)
    pub engine_build: String,
    /// Probe run report
    #[serde(flatten)]
    pub report: ProbeReport,
}

impl CheckReport {
    /// Wrap a probe report with the engine build name.
    pub fn new(report: ProbeReport, engine_build: impl Into<String>) -> Self {
        Self {
            engine_build: engine_build.into(),
            report,
        }
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.report;

        writeln!(w, "{}", "DIFC Capability Check".bold())?;
        writeln!(w, "  Run ID:       {}", report.run_id)?;
        writeln!(w, "  Engine build: {}", self.engine_build)?;
        writeln!(w, "  Application:  {}", report.application_id)?;
        writeln!(w, "  Brokers:      {}", report.bootstrap_servers)?;

        match report.settle {
            Some(ref settle) => writeln!(
                w,
                "  Settle:       {} after {}ms ({} polls)",
                settle.final_state, settle.elapsed_ms, settle.polls
            )?,
            None => writeln!(w, "  Settle:       {}", "not reached".dimmed())?,
        }

        writeln!(w)?;
        writeln!(w, "Topology:")?;
        for line in report.topology.lines() {
            writeln!(w, "  {}", line)?;
        }
        writeln!(w)?;

        match report.result {
            ProbeResult::Confirmed { ref version } => {
                writeln!(w, "  Result:       {}", "CONFIRMED".green().bold())?;
                writeln!(w, "  Version:      \"{}\"", version)?;
            }
            ProbeResult::Mismatch {
                ref version,
                enabled,
            } => {
                writeln!(w, "  Result:       {}", "MISMATCH".yellow().bold())?;
                writeln!(w, "  Version:      \"{}\"", version)?;
                writeln!(w, "  Enabled:      {}", enabled)?;
            }
            ProbeResult::Absent { ref detail } => {
                writeln!(w, "  Result:       {}", "ABSENT".red().bold())?;
                writeln!(w, "  Detail:       {}", detail)?;
            }
            ProbeResult::RuntimeFailure { ref detail } => {
                writeln!(w, "  Result:       {}", "RUNTIME FAILURE".red().bold())?;
                writeln!(w, "  Detail:       {}", detail.red())?;
            }
        }

        match report.teardown {
            TeardownStatus::NotRequired => writeln!(w, "  Teardown:     not required")?,
            TeardownStatus::Closed => writeln!(w, "  Teardown:     closed")?,
            TeardownStatus::Failed { ref detail } => {
                writeln!(w, "  Teardown:     {} ({})", "failed".yellow(), detail)?
            }
        }
        writeln!(w, "  Duration:     {}ms", report.duration_ms())?;

        Ok(())
    }
}
