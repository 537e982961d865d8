//! `difcprobe topology` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use difcprobe_core::config::DifcProbeConfig;
use difcprobe_core::types::PipelineDescriptor;
use difcprobe_probe::TopologyBuilder;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `topology` command.
///
/// Builds the inert topology from the configured topic pattern without
/// touching any engine.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = DifcProbeConfig::load_or_default(config_path).await?;
    let descriptor = TopologyBuilder::from_config(&config.probe).try_build()?;

    info!(pattern = descriptor.pattern_str(), "built inert topology");

    writer.render(&TopologyReport::from(&descriptor))?;
    Ok(())
}

/// Topology description output.
#[derive(Serialize)]
pub struct TopologyReport {
    /// Source node name
    pub source: String,
    /// Topic filter pattern
    pub pattern: String,
    /// Engine-style textual description
    pub description: String,
}

impl From<&PipelineDescriptor> for TopologyReport {
    fn from(descriptor: &PipelineDescriptor) -> Self {
        Self {
            source: descriptor.source().name().to_owned(),
            pattern: descriptor.source().pattern().as_str().to_owned(),
            description: descriptor.describe(),
        }
    }
}

impl Render for TopologyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        write!(w, "{}", self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_report_from_default_topology() {
        let descriptor = difcprobe_probe::topology::build();
        let report = TopologyReport::from(&descriptor);
        assert_eq!(report.source, "KSTREAM-SOURCE-0000000000");
        assert_eq!(report.pattern, r"^__difc_probe_dummy_topic_\d+$");
        assert_eq!(report.pattern, descriptor.pattern_str());
        assert!(report.description.starts_with("Topologies:"));
    }

    #[test]
    fn test_topology_report_render_text() {
        let report = TopologyReport::from(&difcprobe_probe::topology::build());
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Source: KSTREAM-SOURCE-0000000000"));
        assert!(output.contains("--> none"));
    }
}
