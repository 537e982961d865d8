//! 프로브 에러 타입
//!
//! [`ProbeError`]는 토폴로지 구성과 엔진 구동 중 발생하는 에러를 표현합니다.
//! 프로브 실행 자체는 에러를 반환하지 않고 [`ProbeResult`](difcprobe_core::ProbeResult)로
//! 분류하지만, 내부 단계들은 이 타입으로 실패를 전달합니다.

use difcprobe_core::engine::EngineState;
use difcprobe_core::error::EngineError;

/// 프로브 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// 토픽 필터 패턴이 유효하지 않음
    #[error("topology error: pattern '{pattern}': {reason}")]
    Topology {
        /// 문제가 된 패턴
        pattern: String,
        /// 거부 사유
        reason: String,
    },

    /// 엔진 계약 호출 실패
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// 제한 시간 안에 엔진이 RUNNING에 도달하지 못함
    #[error("engine did not reach RUNNING within {timeout_ms}ms (last state: {last_state})")]
    SettleTimeout {
        /// 대기 제한 시간 (밀리초)
        timeout_ms: u64,
        /// 마지막으로 관측된 상태
        last_state: EngineState,
    },

    /// 안정화 대기 중 엔진이 종료/오류 상태로 전환됨
    #[error("engine entered {state} while settling")]
    EngineTerminated {
        /// 관측된 상태
        state: EngineState,
    },
}
