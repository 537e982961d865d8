//! 안정화 대기: 엔진 시작 후 인트로스펙션 전까지의 대기 전략
//!
//! 기본 전략은 [`SettleStrategy::Poll`]로, 엔진 상태를 주기적으로 조회하여
//! `RUNNING` 도달을 확인하고 제한 시간을 넘기면 실패합니다.
//! [`SettleStrategy::Fixed`]는 고정 시간만큼 대기하는 단순 전략입니다.
//!
//! 진행 상황은 선택적으로 `mpsc` 채널을 통해 [`SettleProgress`] 이벤트로 전달됩니다.
//! 채널이 가득 차거나 닫혀 있어도 대기 자체에는 영향을 주지 않습니다.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use difcprobe_core::config::{ProbeConfig, SettleMode};
use difcprobe_core::engine::{EngineState, StreamsEngine};

use crate::error::ProbeError;

/// 안정화 대기 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// 상태 조회 기반 대기
    Poll {
        /// 최대 대기 시간
        timeout: Duration,
        /// 조회 주기
        interval: Duration,
    },
    /// 고정 시간 대기
    Fixed(Duration),
}

impl SettleStrategy {
    /// 프로브 설정에서 전략을 생성합니다.
    pub fn from_config(config: &ProbeConfig) -> Self {
        match config.settle_mode {
            SettleMode::Poll => Self::Poll {
                timeout: Duration::from_millis(config.settle_timeout_ms),
                interval: Duration::from_millis(config.poll_interval_ms),
            },
            SettleMode::Fixed => Self::Fixed(Duration::from_millis(config.fixed_settle_ms)),
        }
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::from_config(&ProbeConfig::default())
    }
}

/// 안정화 진행 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleProgress {
    /// 상태를 한 번 조회함
    Polled {
        /// 조회 횟수 (1부터 시작)
        attempt: u32,
        /// 관측된 상태
        state: EngineState,
        /// 시작 후 경과 시간
        elapsed: Duration,
    },
    /// 고정 대기를 마침
    Waited {
        /// 대기한 시간
        elapsed: Duration,
    },
    /// 인트로스펙션 가능한 상태에 도달함
    Settled {
        /// 관측된 상태
        state: EngineState,
        /// 시작 후 경과 시간
        elapsed: Duration,
    },
}

/// 안정화 대기 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettleOutcome {
    /// 대기 종료 시점의 엔진 상태
    pub final_state: EngineState,
    /// 대기에 걸린 시간 (밀리초)
    pub elapsed_ms: u64,
    /// 상태 조회 횟수 (고정 대기는 1)
    pub polls: u32,
}

/// 엔진이 인트로스펙션 가능한 상태가 될 때까지 대기합니다.
///
/// # Errors
///
/// - `ProbeError::SettleTimeout`: 폴링 전략에서 제한 시간 초과
/// - `ProbeError::EngineTerminated`: 대기 중 엔진이 종료/오류 상태로 전환됨
pub async fn settle<E: StreamsEngine>(
    engine: &E,
    strategy: SettleStrategy,
    progress: Option<&mpsc::Sender<SettleProgress>>,
) -> Result<SettleOutcome, ProbeError> {
    match strategy {
        SettleStrategy::Poll { timeout, interval } => {
            poll_until_running(engine, timeout, interval, progress).await
        }
        SettleStrategy::Fixed(duration) => wait_fixed(engine, duration, progress).await,
    }
}

async fn poll_until_running<E: StreamsEngine>(
    engine: &E,
    timeout: Duration,
    interval: Duration,
    progress: Option<&mpsc::Sender<SettleProgress>>,
) -> Result<SettleOutcome, ProbeError> {
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let state = engine.state();
        let elapsed = started.elapsed();
        debug!(attempt, %state, elapsed_ms = elapsed.as_millis() as u64, "polled engine state");
        report(
            progress,
            SettleProgress::Polled {
                attempt,
                state,
                elapsed,
            },
        );

        if state.is_settled() {
            report(progress, SettleProgress::Settled { state, elapsed });
            return Ok(SettleOutcome {
                final_state: state,
                elapsed_ms: elapsed.as_millis() as u64,
                polls: attempt,
            });
        }

        if state.is_terminal() {
            return Err(ProbeError::EngineTerminated { state });
        }

        if elapsed >= timeout {
            return Err(ProbeError::SettleTimeout {
                timeout_ms: timeout.as_millis() as u64,
                last_state: state,
            });
        }

        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

async fn wait_fixed<E: StreamsEngine>(
    engine: &E,
    duration: Duration,
    progress: Option<&mpsc::Sender<SettleProgress>>,
) -> Result<SettleOutcome, ProbeError> {
    tokio::time::sleep(duration).await;
    report(progress, SettleProgress::Waited { elapsed: duration });

    // 고정 대기는 RUNNING 도달을 보장하지 않으며, 종료/오류 상태만 걸러냅니다.
    let state = engine.state();
    if state.is_terminal() {
        return Err(ProbeError::EngineTerminated { state });
    }

    report(
        progress,
        SettleProgress::Settled {
            state,
            elapsed: duration,
        },
    );
    Ok(SettleOutcome {
        final_state: state,
        elapsed_ms: duration.as_millis() as u64,
        polls: 1,
    })
}

fn report(progress: Option<&mpsc::Sender<SettleProgress>>, event: SettleProgress) {
    if let Some(tx) = progress {
        if let Err(e) = tx.try_send(event) {
            debug!(error = %e, "dropping settle progress event");
        }
    }
}
