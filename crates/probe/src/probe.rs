//! 능력 프로브: 일회용 엔진 인스턴스를 띄워 확장 인트로스펙션 표면을 확인합니다.
//!
//! [`CapabilityProbe`]는 한 번의 실행에서 다음 순서를 엄격히 따릅니다.
//!
//! ```text
//! create -> start -> settle -> difc_version -> is_difc_enabled -> classify -> close
//!    │        │         │            │                │                         ▲
//!    │        └─────────┴────────────┴────────────────┴── 실패/부재 ────────────┘
//!    └── 실패 시 RuntimeFailure (정리할 핸들 없음)
//! ```
//!
//! 재시도는 없으며, 핸들이 생성된 이후에는 모든 경로에서 `close()`가 정확히
//! 한 번 호출됩니다. 정리 실패는 이미 결정된 분류를 바꾸지 않습니다.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use difcprobe_core::config::{EngineConfig, ExpectedBaseline};
use difcprobe_core::engine::{Capability, EngineFactory, StreamsEngine};
use difcprobe_core::error::EngineError;
use difcprobe_core::types::{PipelineDescriptor, ProbeResult};

use crate::report::{ProbeReport, TeardownStatus};
use crate::settle::{self, SettleOutcome, SettleProgress, SettleStrategy};

/// 확장 버전 조회 연산 이름
const VERSION_OPERATION: &str = "difc_version";
/// 확장 플래그 조회 연산 이름
const FLAG_OPERATION: &str = "is_difc_enabled";

/// 능력 프로브
///
/// 엔진 팩토리를 통해 인스턴스를 생성하고, 한 번의 확인 주기를 수행한 뒤
/// 인스턴스를 폐기합니다.
///
/// # 사용 예시
/// ```ignore
/// use difcprobe_probe::{CapabilityProbe, topology};
///
/// let probe = CapabilityProbe::new(factory)
///     .baseline(config.probe.baseline())
///     .settle_strategy(SettleStrategy::from_config(&config.probe));
///
/// let report = probe.run(&topology::build(), &config.engine).await;
/// println!("{}", report.result);
/// ```
pub struct CapabilityProbe<F: EngineFactory> {
    factory: F,
    baseline: ExpectedBaseline,
    strategy: SettleStrategy,
    progress_tx: Option<mpsc::Sender<SettleProgress>>,
}

impl<F: EngineFactory> CapabilityProbe<F> {
    /// 기본 기준값과 기본 안정화 전략으로 프로브를 생성합니다.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            baseline: ExpectedBaseline::default(),
            strategy: SettleStrategy::default(),
            progress_tx: None,
        }
    }

    /// 기대 기준값을 지정합니다.
    pub fn baseline(mut self, baseline: ExpectedBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    /// 안정화 대기 전략을 지정합니다.
    pub fn settle_strategy(mut self, strategy: SettleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 안정화 진행 이벤트를 받을 채널을 지정합니다.
    pub fn progress_sender(mut self, tx: mpsc::Sender<SettleProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// 분류 결과만 반환하는 단축 메서드입니다.
    pub async fn classify(
        &self,
        descriptor: &PipelineDescriptor,
        config: &EngineConfig,
    ) -> ProbeResult {
        self.run(descriptor, config).await.result
    }

    /// 한 번의 프로브 주기를 실행하고 보고서를 반환합니다.
    ///
    /// 이 메서드는 실패하지 않습니다. 모든 실패는 [`ProbeResult`]로 분류됩니다.
    pub async fn run(&self, descriptor: &PipelineDescriptor, config: &EngineConfig) -> ProbeReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            %run_id,
            application_id = %config.application_id,
            bootstrap_servers = %config.bootstrap_servers,
            pattern = descriptor.pattern_str(),
            "starting capability probe"
        );

        let mut engine = match self.factory.create(descriptor, config) {
            Ok(engine) => engine,
            Err(e) => {
                error!(%run_id, error = %e, "failed to construct engine instance");
                return ProbeReport {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    application_id: config.application_id.clone(),
                    bootstrap_servers: config.bootstrap_servers.clone(),
                    topology: descriptor.describe(),
                    settle: None,
                    result: ProbeResult::RuntimeFailure {
                        detail: e.to_string(),
                    },
                    teardown: TeardownStatus::NotRequired,
                };
            }
        };

        let (result, settle) = self.drive(&mut engine).await;
        let teardown = teardown(&mut engine).await;

        match &result {
            ProbeResult::Confirmed { version } => {
                info!(%run_id, version = %version, "extension confirmed");
            }
            ProbeResult::Mismatch { version, enabled } => {
                info!(%run_id, version = %version, enabled, "extension reports unexpected values");
            }
            ProbeResult::Absent { detail } => {
                info!(%run_id, detail = %detail, "extension surface absent");
            }
            ProbeResult::RuntimeFailure { detail } => {
                error!(%run_id, detail = %detail, "probe runtime failure");
            }
        }

        ProbeReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            application_id: config.application_id.clone(),
            bootstrap_servers: config.bootstrap_servers.clone(),
            topology: descriptor.describe(),
            settle,
            result,
            teardown,
        }
    }

    /// start → settle → introspect 단계를 수행합니다. 정리는 호출자가 담당합니다.
    async fn drive(&self, engine: &mut F::Engine) -> (ProbeResult, Option<SettleOutcome>) {
        if let Err(e) = engine.start().await {
            return (
                ProbeResult::RuntimeFailure {
                    detail: e.to_string(),
                },
                None,
            );
        }
        info!(state = %engine.state(), "engine started, settling");

        let outcome = match settle::settle(&*engine, self.strategy, self.progress_tx.as_ref()).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                return (
                    ProbeResult::RuntimeFailure {
                        detail: e.to_string(),
                    },
                    None,
                );
            }
        };
        debug!(
            state = %outcome.final_state,
            elapsed_ms = outcome.elapsed_ms,
            polls = outcome.polls,
            "engine settled"
        );

        (introspect(&*engine, &self.baseline), Some(outcome))
    }
}

/// 확장 인트로스펙션 연산을 호출하고 결과를 분류합니다.
///
/// 버전 조회에서 부재가 확인되면 플래그 조회는 시도하지 않습니다.
pub fn introspect<E: StreamsEngine>(engine: &E, baseline: &ExpectedBaseline) -> ProbeResult {
    let version = match negotiate(VERSION_OPERATION, engine.difc_version()) {
        Ok(version) => version,
        Err(result) => return result,
    };
    debug!(version = %version, "extension version reported");

    let enabled = match negotiate(FLAG_OPERATION, engine.is_difc_enabled()) {
        Ok(enabled) => enabled,
        Err(result) => return result,
    };
    debug!(enabled, "extension flag reported");

    classify_observation(baseline, version, enabled)
}

/// 관측된 버전/플래그를 기준값과 비교합니다.
pub fn classify_observation(
    baseline: &ExpectedBaseline,
    version: String,
    enabled: bool,
) -> ProbeResult {
    if baseline.matches(&version, enabled) {
        ProbeResult::Confirmed { version }
    } else {
        ProbeResult::Mismatch { version, enabled }
    }
}

/// 기능 협상 결과를 값 또는 최종 분류로 변환합니다.
///
/// 엔진이 `UnsupportedOperation` 에러를 반환한 경우도 부재로 취급합니다.
/// 그 밖의 에러는 런타임 실패로 분류합니다.
fn negotiate<T>(
    operation: &str,
    outcome: Result<Capability<T>, EngineError>,
) -> Result<T, ProbeResult> {
    match outcome {
        Ok(Capability::Supported(value)) => Ok(value),
        Ok(Capability::Unsupported) => Err(ProbeResult::Absent {
            detail: format!("engine build does not provide '{operation}'"),
        }),
        Err(e) if e.is_unsupported() => Err(ProbeResult::Absent {
            detail: e.to_string(),
        }),
        Err(e) => Err(ProbeResult::RuntimeFailure {
            detail: e.to_string(),
        }),
    }
}

async fn teardown<E: StreamsEngine>(engine: &mut E) -> TeardownStatus {
    match engine.close().await {
        Ok(()) => {
            debug!(state = %engine.state(), "engine closed");
            TeardownStatus::Closed
        }
        Err(e) => {
            warn!(error = %e, "engine close failed; keeping primary classification");
            TeardownStatus::Failed {
                detail: e.to_string(),
            }
        }
    }
}
