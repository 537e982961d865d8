//! Capability probe integration tests.
//!
//! Drives `CapabilityProbe::run` against fake engine collaborators and checks
//! the classification together with the lifecycle calls made on every path.

mod helpers;

use std::time::Duration;

use tokio::sync::mpsc;

use difcprobe_core::config::{EngineConfig, ExpectedBaseline};
use difcprobe_core::engine::EngineState;
use difcprobe_core::error::EngineError;
use difcprobe_core::types::ProbeResult;
use difcprobe_probe::topology;
use difcprobe_probe::{CapabilityProbe, SettleProgress, SettleStrategy, TeardownStatus};

use helpers::fake_engine::{FakeBehavior, FakeFactory, Introspection};

const EXPECTED_VERSION: &str = "DIFC-Enabled-Kafka-4.0.0";

fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

// =============================================================================
// Classification scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn extension_with_expected_values_is_confirmed() {
    let factory = FakeFactory::with_extension(EXPECTED_VERSION, true);
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let report = probe.run(&topology::build(), &engine_config()).await;

    assert_eq!(
        report.result,
        ProbeResult::Confirmed {
            version: EXPECTED_VERSION.to_owned()
        }
    );
    assert_eq!(log.closes(), 1, "close must be invoked exactly once");
    assert_eq!(report.teardown, TeardownStatus::Closed);
    assert!(report.is_confirmed());
}

#[tokio::test(start_paused = true)]
async fn raised_unsupported_operation_is_absent() {
    let factory = FakeFactory::raising_unsupported();
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let result = probe.classify(&topology::build(), &engine_config()).await;

    assert!(
        matches!(result, ProbeResult::Absent { .. }),
        "expected Absent, got {result:?}"
    );
    assert_eq!(log.closes(), 1, "close must be invoked exactly once");
    assert_eq!(
        log.flag_calls(),
        0,
        "flag introspection must be skipped once the version call is absent"
    );
}

#[tokio::test(start_paused = true)]
async fn negotiated_unsupported_is_absent() {
    let factory = FakeFactory::new(FakeBehavior {
        introspection: Introspection::Missing,
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let report = probe.run(&topology::build(), &engine_config()).await;

    match &report.result {
        ProbeResult::Absent { detail } => assert!(detail.contains("difc_version")),
        other => panic!("expected Absent, got {other:?}"),
    }
    assert_eq!(log.version_calls(), 1);
    assert_eq!(log.flag_calls(), 0);
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn flag_missing_after_version_is_absent() {
    let factory = FakeFactory::new(FakeBehavior {
        introspection: Introspection::FlagRaising {
            version: EXPECTED_VERSION.to_owned(),
        },
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let result = probe.classify(&topology::build(), &engine_config()).await;

    assert!(matches!(result, ProbeResult::Absent { .. }));
    assert_eq!(log.version_calls(), 1);
    assert_eq!(log.flag_calls(), 1);
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn unexpected_version_is_mismatch() {
    let factory = FakeFactory::with_extension("DIFC-Enabled-Kafka-3.7.0", true);
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let result = probe.classify(&topology::build(), &engine_config()).await;

    assert_eq!(
        result,
        ProbeResult::Mismatch {
            version: "DIFC-Enabled-Kafka-3.7.0".to_owned(),
            enabled: true,
        }
    );
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_flag_is_mismatch_never_confirmed() {
    let factory = FakeFactory::with_extension(EXPECTED_VERSION, false);
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let result = probe.classify(&topology::build(), &engine_config()).await;

    assert_eq!(
        result,
        ProbeResult::Mismatch {
            version: EXPECTED_VERSION.to_owned(),
            enabled: false,
        }
    );
    assert!(!result.is_confirmed());
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn overridden_baseline_changes_expectation() {
    let factory = FakeFactory::with_extension("DIFC-Enabled-Kafka-4.1.0", false);
    let probe = CapabilityProbe::new(factory).baseline(ExpectedBaseline {
        expected_version: "DIFC-Enabled-Kafka-4.1.0".to_owned(),
        expected_enabled: false,
    });

    let result = probe.classify(&topology::build(), &engine_config()).await;

    assert!(result.is_confirmed(), "got {result:?}");
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test(start_paused = true)]
async fn construction_failure_is_runtime_failure_without_introspection() {
    let factory = FakeFactory::new(FakeBehavior {
        create_error: Some(EngineError::Configuration(
            "bootstrap.servers is unreachable".to_owned(),
        )),
        introspection: Introspection::Extension {
            version: EXPECTED_VERSION.to_owned(),
            enabled: true,
        },
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let report = probe.run(&topology::build(), &engine_config()).await;

    match &report.result {
        ProbeResult::RuntimeFailure { detail } => {
            assert!(detail.contains("bootstrap.servers is unreachable"))
        }
        other => panic!("expected RuntimeFailure, got {other:?}"),
    }
    assert_eq!(log.creates(), 1);
    assert_eq!(log.starts(), 0);
    assert_eq!(log.introspection_calls(), 0);
    assert_eq!(log.closes(), 0, "there is no handle to close");
    assert_eq!(report.teardown, TeardownStatus::NotRequired);
    assert!(report.settle.is_none());
}

#[tokio::test(start_paused = true)]
async fn startup_failure_still_closes_handle() {
    let factory = FakeFactory::new(FakeBehavior {
        start_error: Some(EngineError::Startup("state directory locked".to_owned())),
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let report = probe.run(&topology::build(), &engine_config()).await;

    assert!(matches!(report.result, ProbeResult::RuntimeFailure { .. }));
    assert_eq!(log.introspection_calls(), 0);
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn settle_timeout_is_runtime_failure() {
    let factory = FakeFactory::new(FakeBehavior {
        state_after_start: EngineState::Rebalancing,
        introspection: Introspection::Extension {
            version: EXPECTED_VERSION.to_owned(),
            enabled: true,
        },
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory).settle_strategy(SettleStrategy::Poll {
        timeout: Duration::from_secs(3),
        interval: Duration::from_millis(250),
    });

    let report = probe.run(&topology::build(), &engine_config()).await;

    match &report.result {
        ProbeResult::RuntimeFailure { detail } => {
            assert!(detail.contains("did not reach RUNNING"), "{detail}")
        }
        other => panic!("expected RuntimeFailure, got {other:?}"),
    }
    assert_eq!(log.introspection_calls(), 0);
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn fixed_settle_introspects_rebalancing_engine() {
    let factory = FakeFactory::new(FakeBehavior {
        state_after_start: EngineState::Rebalancing,
        introspection: Introspection::Extension {
            version: EXPECTED_VERSION.to_owned(),
            enabled: true,
        },
        ..FakeBehavior::default()
    });
    let probe = CapabilityProbe::new(factory)
        .settle_strategy(SettleStrategy::Fixed(Duration::from_millis(2_000)));

    let report = probe.run(&topology::build(), &engine_config()).await;

    assert!(report.is_confirmed());
    let settle = report.settle.expect("settle outcome recorded");
    assert_eq!(settle.final_state, EngineState::Rebalancing);
    assert_eq!(settle.elapsed_ms, 2_000);
}

#[tokio::test(start_paused = true)]
async fn generic_introspection_fault_is_runtime_failure() {
    let factory = FakeFactory::new(FakeBehavior {
        introspection: Introspection::Faulty("coordinator not available".to_owned()),
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let result = probe.classify(&topology::build(), &engine_config()).await;

    match result {
        ProbeResult::RuntimeFailure { detail } => {
            assert!(detail.contains("coordinator not available"))
        }
        other => panic!("expected RuntimeFailure, got {other:?}"),
    }
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_failure_does_not_mask_classification() {
    let factory = FakeFactory::new(FakeBehavior {
        close_error: Some(EngineError::Timeout {
            operation: "close".to_owned(),
            timeout_ms: 5_000,
        }),
        introspection: Introspection::Extension {
            version: EXPECTED_VERSION.to_owned(),
            enabled: true,
        },
        ..FakeBehavior::default()
    });
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    let report = probe.run(&topology::build(), &engine_config()).await;

    assert!(report.is_confirmed(), "got {:?}", report.result);
    match &report.teardown {
        TeardownStatus::Failed { detail } => assert!(detail.contains("timed out")),
        other => panic!("expected Failed teardown, got {other:?}"),
    }
    assert_eq!(log.closes(), 1);
}

// =============================================================================
// Ordering and call-count invariants
// =============================================================================

#[tokio::test(start_paused = true)]
async fn lifecycle_calls_follow_protocol_order() {
    let factory = FakeFactory::with_extension(EXPECTED_VERSION, true);
    let log = factory.log();
    let probe = CapabilityProbe::new(factory);

    probe.run(&topology::build(), &engine_config()).await;

    assert_eq!(
        log.events(),
        vec!["create", "start", "difc_version", "is_difc_enabled", "close"]
    );
}

#[tokio::test(start_paused = true)]
async fn close_is_invoked_exactly_once_on_every_classification_path() {
    let behaviors = vec![
        (
            "confirmed",
            FakeBehavior {
                introspection: Introspection::Extension {
                    version: EXPECTED_VERSION.to_owned(),
                    enabled: true,
                },
                ..FakeBehavior::default()
            },
        ),
        (
            "mismatch",
            FakeBehavior {
                introspection: Introspection::Extension {
                    version: "4.0.0".to_owned(),
                    enabled: true,
                },
                ..FakeBehavior::default()
            },
        ),
        (
            "absent",
            FakeBehavior {
                introspection: Introspection::Raising,
                ..FakeBehavior::default()
            },
        ),
        (
            "runtime_failure",
            FakeBehavior {
                state_after_start: EngineState::Error,
                ..FakeBehavior::default()
            },
        ),
    ];

    for (expected_label, behavior) in behaviors {
        let factory = FakeFactory::new(behavior);
        let log = factory.log();
        let probe = CapabilityProbe::new(factory);

        let result = probe.classify(&topology::build(), &engine_config()).await;

        assert_eq!(result.label(), expected_label);
        assert_eq!(
            log.closes(),
            1,
            "{expected_label}: close must be invoked exactly once"
        );
        assert_eq!(
            log.events().last().copied(),
            Some("close"),
            "{expected_label}: teardown must be the last call"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn settle_progress_is_published() {
    let factory = FakeFactory::with_extension(EXPECTED_VERSION, true);
    let (tx, mut rx) = mpsc::channel(8);
    let probe = CapabilityProbe::new(factory).progress_sender(tx);

    probe.run(&topology::build(), &engine_config()).await;
    drop(probe);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(
        events.first(),
        Some(SettleProgress::Polled {
            attempt: 1,
            state: EngineState::Running,
            ..
        })
    ));
    assert!(matches!(
        events.last(),
        Some(SettleProgress::Settled { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn report_carries_engine_identity_and_topology() {
    let factory = FakeFactory::with_extension(EXPECTED_VERSION, true);
    let probe = CapabilityProbe::new(factory);
    let config = EngineConfig {
        application_id: "difc-verifier-ci".to_owned(),
        bootstrap_servers: "broker:29092".to_owned(),
        ..EngineConfig::default()
    };

    let report = probe.run(&topology::build(), &config).await;

    assert_eq!(report.application_id, "difc-verifier-ci");
    assert_eq!(report.bootstrap_servers, "broker:29092");
    assert!(report.topology.contains("__difc_probe_dummy_topic_"));
    assert!(report.finished_at >= report.started_at);
}
