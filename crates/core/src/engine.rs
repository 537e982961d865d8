//! 엔진 생명주기 계약: 스트림 처리 엔진을 불투명한 외부 의존성으로 다루기 위한 trait
//!
//! 프로브는 엔진의 실행 세부사항(토폴로지 실행, 파티션 할당, 브로커 통신)을
//! 알지 못하며, 아래의 좁은 계약만 사용합니다.
//!
//! ```text
//! EngineFactory::create ─▶ StreamsEngine
//!                            ├─ start()
//!                            ├─ state()
//!                            ├─ difc_version()      (확장)
//!                            ├─ is_difc_enabled()   (확장)
//!                            └─ close()
//! ```
//!
//! 확장 인트로스펙션 연산은 기본 구현이 [`Capability::Unsupported`]를 반환합니다.
//! 확장이 없는 엔진 빌드는 단순히 이 메서드를 오버라이드하지 않습니다.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::PipelineDescriptor;

// ─── Capability ──────────────────────────────────────────────────────

/// 확장 기능 협상 결과
///
/// "기능이 없음"과 "기능은 있으나 실패함"을 타입 수준에서 구분합니다.
/// 후자는 `Err(EngineError)`로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability<T> {
    /// 엔진 빌드가 해당 연산을 제공함
    Supported(T),
    /// 엔진 빌드에 해당 연산이 존재하지 않음
    Unsupported,
}

impl<T> Capability<T> {
    /// 지원 여부를 반환합니다.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    /// 지원되는 경우 값을 꺼냅니다.
    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(value) => Some(value),
            Self::Unsupported => None,
        }
    }
}

// ─── EngineState ─────────────────────────────────────────────────────

/// 엔진 인스턴스 생명주기 상태
///
/// 상태 전환:
/// - `Created` → `start()` → `Rebalancing` → `Running`
/// - `Running` ⇄ `Rebalancing`
/// - 모든 상태 → `close()` → `PendingShutdown` → `NotRunning`
/// - 내부 오류 시 → `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    /// 생성됨 (start 전)
    Created,
    /// 시작/리밸런싱 진행 중
    Rebalancing,
    /// 안정 상태로 실행 중
    Running,
    /// 종료 진행 중
    PendingShutdown,
    /// 종료됨
    NotRunning,
    /// 복구 불가능한 오류 상태
    Error,
}

impl EngineState {
    /// 인트로스펙션을 수행해도 되는 안정 상태인지 확인합니다.
    pub fn is_settled(self) -> bool {
        self == Self::Running
    }

    /// 더 이상 RUNNING으로 전환될 수 없는 상태인지 확인합니다.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::PendingShutdown | Self::NotRunning | Self::Error)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Rebalancing => write!(f, "REBALANCING"),
            Self::Running => write!(f, "RUNNING"),
            Self::PendingShutdown => write!(f, "PENDING_SHUTDOWN"),
            Self::NotRunning => write!(f, "NOT_RUNNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ─── StreamsEngine ───────────────────────────────────────────────────

/// 실행 중인 엔진 인스턴스 하나에 대한 핸들
///
/// 프로브가 한 번의 실행 동안 독점적으로 소유합니다.
///
/// # 구현 규칙
/// - `start()`는 논블로킹이며 내부 시작 시퀀스를 개시만 합니다.
/// - `close()`는 멱등이어야 합니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
/// - 확장 연산을 제공하지 않는 빌드는 `difc_version` / `is_difc_enabled`를
///   오버라이드하지 않습니다.
pub trait StreamsEngine: Send {
    /// 현재 생명주기 상태를 반환합니다.
    fn state(&self) -> EngineState;

    /// 엔진을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// 엔진을 종료하고 워커/연결을 정리합니다.
    fn close(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// 확장 버전 식별자를 조회합니다.
    fn difc_version(&self) -> Result<Capability<String>, EngineError> {
        Ok(Capability::Unsupported)
    }

    /// 확장 기능 플래그를 조회합니다.
    fn is_difc_enabled(&self) -> Result<Capability<bool>, EngineError> {
        Ok(Capability::Unsupported)
    }
}

/// 토폴로지와 설정으로 엔진 인스턴스를 생성하는 팩토리
pub trait EngineFactory: Send + Sync {
    /// 생성되는 엔진 타입
    type Engine: StreamsEngine;

    /// 엔진 인스턴스를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정이 잘못되었거나 생성 시점에 필요한 자원을 얻지 못하면
    /// `EngineError::Configuration`을 반환합니다.
    fn create(
        &self,
        topology: &PipelineDescriptor,
        config: &EngineConfig,
    ) -> Result<Self::Engine, EngineError>;
}
