//! 에러 타입: 도메인별 에러 정의

/// difcprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DifcProbeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 엔진 생명주기 / 인트로스펙션 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 엔진 생명주기 계약에서 발생하는 에러
///
/// `UnsupportedOperation`만 "확장 기능 부재"를 뜻하며, 나머지는 모두
/// 런타임 실패로 분류됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// 엔진 인스턴스 생성 실패 (잘못된 설정 등)
    #[error("engine configuration rejected: {0}")]
    Configuration(String),

    /// 엔진 시작 실패
    #[error("engine startup failed: {0}")]
    Startup(String),

    /// 현재 엔진 빌드에 존재하지 않는 연산
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// 인트로스펙션 호출 중 발생한 일반 오류
    #[error("introspection of '{operation}' failed: {reason}")]
    Introspection { operation: String, reason: String },

    /// 엔진 종료 실패
    #[error("engine shutdown failed: {0}")]
    Shutdown(String),

    /// 엔진 자체 시간 제한 초과
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl EngineError {
    /// 확장 기능 부재를 나타내는 에러인지 확인합니다.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}
