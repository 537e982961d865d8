//! 프로브 실행 보고서

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use difcprobe_core::types::ProbeResult;

use crate::settle::SettleOutcome;

/// 엔진 핸들 정리 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TeardownStatus {
    /// 엔진 생성에 실패하여 정리할 핸들이 없음
    NotRequired,
    /// 정상 종료
    Closed,
    /// 종료 중 오류 (분류 결과는 바뀌지 않음)
    Failed { detail: String },
}

/// 한 번의 프로브 실행 보고서
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// 실행 식별자
    pub run_id: Uuid,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 종료 시각
    pub finished_at: DateTime<Utc>,
    /// 엔진 애플리케이션 식별자
    pub application_id: String,
    /// 대상 브로커 주소
    pub bootstrap_servers: String,
    /// 토폴로지 설명
    pub topology: String,
    /// 안정화 대기 결과 (해당 단계에 도달하지 못했으면 `None`)
    pub settle: Option<SettleOutcome>,
    /// 최종 분류
    pub result: ProbeResult,
    /// 핸들 정리 결과
    pub teardown: TeardownStatus,
}

impl ProbeReport {
    /// 확장 기능이 확인되었는지 여부
    pub fn is_confirmed(&self) -> bool {
        self.result.is_confirmed()
    }

    /// 실행에 걸린 시간 (밀리초)
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
