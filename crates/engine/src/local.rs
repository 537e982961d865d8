//! 인프로세스 참조 엔진
//!
//! [`LocalStreamsEngine`]은 단일 워커 태스크로 동작하는 최소 엔진입니다.
//!
//! # 상태 전이
//! ```text
//! CREATED --start--> REBALANCING --(브로커 연결 시도 완료)--> RUNNING
//!    |                    |                                    |
//!    +------close---------+----------------close---------------+--> PENDING_SHUTDOWN --> NOT_RUNNING
//! ```
//!
//! 브로커에 연결하지 못해도 워커는 연결 없이 `RUNNING`으로 전환합니다.
//! 토폴로지가 어떤 토픽과도 매칭되지 않으므로 레코드는 송수신하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use difcprobe_core::config::EngineConfig;
use difcprobe_core::engine::{EngineFactory, EngineState, StreamsEngine};
use difcprobe_core::error::EngineError;
use difcprobe_core::types::PipelineDescriptor;

#[cfg(feature = "difc")]
use difcprobe_core::engine::Capability;

/// [`LocalStreamsEngine`] 팩토리
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEngineFactory;

impl LocalEngineFactory {
    /// 새 팩토리를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for LocalEngineFactory {
    type Engine = LocalStreamsEngine;

    fn create(
        &self,
        topology: &PipelineDescriptor,
        config: &EngineConfig,
    ) -> Result<Self::Engine, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        debug!(
            application_id = %config.application_id,
            pattern = topology.pattern_str(),
            properties = ?config.to_properties(),
            "created local streams engine"
        );

        Ok(LocalStreamsEngine::new(topology.clone(), config))
    }
}

/// 인프로세스 참조 엔진
pub struct LocalStreamsEngine {
    application_id: String,
    topology: PipelineDescriptor,
    brokers: Vec<String>,
    connect_timeout: Duration,
    close_timeout: Duration,
    state: Arc<watch::Sender<EngineState>>,
    cancel_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl LocalStreamsEngine {
    fn new(topology: PipelineDescriptor, config: &EngineConfig) -> Self {
        let (state, _) = watch::channel(EngineState::Created);
        Self {
            application_id: config.application_id.clone(),
            topology,
            brokers: config.broker_addresses(),
            connect_timeout: config.connect_timeout(),
            close_timeout: config.close_timeout(),
            state: Arc::new(state),
            cancel_token: CancellationToken::new(),
            worker: None,
        }
    }

    /// 엔진 애플리케이션 식별자
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// 엔진이 실행 중인 토폴로지
    pub fn topology(&self) -> &PipelineDescriptor {
        &self.topology
    }

    /// 상태 변경 구독 채널
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    fn transition(&self, next: EngineState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "engine state changed");
        }
    }

    #[cfg(feature = "difc")]
    fn ensure_introspectable(&self, operation: &str) -> Result<(), EngineError> {
        let state = self.state();
        if state == EngineState::Created || state.is_terminal() {
            return Err(EngineError::Introspection {
                operation: operation.to_owned(),
                reason: format!("engine is not started (state: {state})"),
            });
        }
        Ok(())
    }
}

impl StreamsEngine for LocalStreamsEngine {
    fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        let current = self.state();
        if current != EngineState::Created {
            return Err(EngineError::Startup(format!(
                "engine can only be started once (state: {current})"
            )));
        }

        self.transition(EngineState::Rebalancing);

        let worker = Worker {
            brokers: self.brokers.clone(),
            connect_timeout: self.connect_timeout,
            state: Arc::clone(&self.state),
            cancel_token: self.cancel_token.clone(),
        };
        self.worker = Some(tokio::spawn(worker.run()));

        info!(application_id = %self.application_id, "local streams engine started");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        if self.state() == EngineState::NotRunning {
            return Ok(());
        }

        self.transition(EngineState::PendingShutdown);
        self.cancel_token.cancel();

        let result = match self.worker.take() {
            Some(mut handle) => match tokio::time::timeout(self.close_timeout, &mut handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(EngineError::Shutdown(format!("worker task failed: {e}"))),
                Err(_) => {
                    handle.abort();
                    Err(EngineError::Timeout {
                        operation: "close".to_owned(),
                        timeout_ms: self.close_timeout.as_millis() as u64,
                    })
                }
            },
            None => Ok(()),
        };

        self.transition(EngineState::NotRunning);
        info!(application_id = %self.application_id, "local streams engine closed");
        result
    }

    #[cfg(feature = "difc")]
    fn difc_version(&self) -> Result<Capability<String>, EngineError> {
        self.ensure_introspectable("difc_version")?;
        Ok(Capability::Supported(crate::DIFC_VERSION.to_owned()))
    }

    #[cfg(feature = "difc")]
    fn is_difc_enabled(&self) -> Result<Capability<bool>, EngineError> {
        self.ensure_introspectable("is_difc_enabled")?;
        Ok(Capability::Supported(true))
    }
}

impl Drop for LocalStreamsEngine {
    fn drop(&mut self) {
        // close 없이 버려진 경우 워커가 남지 않도록 취소
        self.cancel_token.cancel();
    }
}

/// 엔진 워커 태스크
struct Worker {
    brokers: Vec<String>,
    connect_timeout: Duration,
    state: Arc<watch::Sender<EngineState>>,
    cancel_token: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let connection = tokio::select! {
            _ = self.cancel_token.cancelled() => {
                debug!("worker cancelled before broker connection");
                return;
            }
            stream = connect_any(&self.brokers, self.connect_timeout) => stream,
        };

        match &connection {
            Some(stream) => {
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_owned());
                info!(broker = %peer, "connected to broker");
            }
            None => warn!(
                brokers = ?self.brokers,
                "no broker reachable, running without connection"
            ),
        }

        // close가 먼저 상태를 바꿨다면 RUNNING으로 덮어쓰지 않음
        self.state.send_if_modified(|state| {
            if *state == EngineState::Rebalancing {
                *state = EngineState::Running;
                true
            } else {
                false
            }
        });

        self.cancel_token.cancelled().await;
        drop(connection);
        debug!("worker stopped");
    }
}

/// 브로커 목록을 순서대로 시도하여 처음 연결된 스트림을 반환합니다.
async fn connect_any(brokers: &[String], connect_timeout: Duration) -> Option<TcpStream> {
    for broker in brokers {
        match tokio::time::timeout(connect_timeout, TcpStream::connect(broker.as_str())).await {
            Ok(Ok(stream)) => return Some(stream),
            Ok(Err(e)) => debug!(broker = %broker, error = %e, "broker connection failed"),
            Err(_) => debug!(
                broker = %broker,
                timeout_ms = connect_timeout.as_millis() as u64,
                "broker connection timed out"
            ),
        }
    }
    None
}
