//! 설정 관리: difcprobe.toml 파싱 및 런타임 설정
//!
//! [`DifcProbeConfig`]는 로깅, 엔진, 프로브 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DIFCPROBE_ENGINE_BOOTSTRAP_SERVERS=broker:9092` 형식)
//! 3. 설정 파일 (`difcprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), difcprobe_core::error::DifcProbeError> {
//! use difcprobe_core::config::DifcProbeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DifcProbeConfig::load("difcprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DifcProbeConfig::parse("[engine]\nbootstrap_servers = \"broker:9092\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, DifcProbeError};

/// 기대하는 확장 버전 식별자 기본값
pub const DEFAULT_EXPECTED_VERSION: &str = "DIFC-Enabled-Kafka-4.0.0";

/// 기본 토픽 필터 (실제 토픽과 절대 매칭되지 않는 예약 이름)
pub const DEFAULT_TOPIC_PATTERN: &str = r"^__difc_probe_dummy_topic_\d+$";

/// difcprobe 통합 설정
///
/// `difcprobe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DifcProbeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 엔진 인스턴스 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 프로브 설정
    #[serde(default)]
    pub probe: ProbeConfig,
}

impl DifcProbeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 검증은 모든 계층이 병합된 뒤 한 번만 수행합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DifcProbeError> {
        let mut config = Self::read_file(path.as_ref()).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값으로 대체하여 로드합니다.
    ///
    /// 프로브는 설정 파일 없이도 기본 설정으로 동작할 수 있어야 하므로
    /// `FileNotFound`만 기본값으로 대체하고, 파싱 오류는 그대로 전파합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, DifcProbeError> {
        let config = Self::load_layered(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// 파일(없으면 기본값)과 환경변수 계층만 병합하고 검증하지 않습니다.
    ///
    /// CLI 인자처럼 상위 계층을 추가로 적용하는 호출자는 마지막에
    /// [`validate`](Self::validate)를 직접 호출해야 합니다.
    pub async fn load_layered(path: impl AsRef<Path>) -> Result<Self, DifcProbeError> {
        let path = path.as_ref();
        let mut config = match Self::read_file(path).await {
            Ok(config) => config,
            Err(DifcProbeError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DifcProbeError> {
        let config = Self::read_file(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self, DifcProbeError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DifcProbeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DifcProbeError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DifcProbeError> {
        toml::from_str(toml_str).map_err(|e| {
            DifcProbeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DIFCPROBE_{SECTION}_{FIELD}`
    /// 예: `DIFCPROBE_PROBE_EXPECTED_ENABLED=false`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DIFCPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DIFCPROBE_GENERAL_LOG_FORMAT");

        // Engine
        override_string(
            &mut self.engine.application_id,
            "DIFCPROBE_ENGINE_APPLICATION_ID",
        );
        override_string(
            &mut self.engine.bootstrap_servers,
            "DIFCPROBE_ENGINE_BOOTSTRAP_SERVERS",
        );
        override_u64(
            &mut self.engine.connect_timeout_ms,
            "DIFCPROBE_ENGINE_CONNECT_TIMEOUT_MS",
        );
        override_u64(
            &mut self.engine.close_timeout_ms,
            "DIFCPROBE_ENGINE_CLOSE_TIMEOUT_MS",
        );

        // Probe
        override_string(
            &mut self.probe.expected_version,
            "DIFCPROBE_PROBE_EXPECTED_VERSION",
        );
        override_bool(
            &mut self.probe.expected_enabled,
            "DIFCPROBE_PROBE_EXPECTED_ENABLED",
        );
        override_string(&mut self.probe.topic_pattern, "DIFCPROBE_PROBE_TOPIC_PATTERN");
        if let Ok(val) = std::env::var("DIFCPROBE_PROBE_SETTLE_MODE") {
            match val.parse::<SettleMode>() {
                Ok(mode) => self.probe.settle_mode = mode,
                Err(_) => warn!(
                    env_key = "DIFCPROBE_PROBE_SETTLE_MODE",
                    value = val.as_str(),
                    "failed to parse settle mode from env var, ignoring"
                ),
            }
        }
        override_u64(
            &mut self.probe.settle_timeout_ms,
            "DIFCPROBE_PROBE_SETTLE_TIMEOUT_MS",
        );
        override_u64(
            &mut self.probe.poll_interval_ms,
            "DIFCPROBE_PROBE_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.probe.fixed_settle_ms,
            "DIFCPROBE_PROBE_FIXED_SETTLE_MS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DifcProbeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.engine.validate()?;
        self.probe.validate()?;
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> DifcProbeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 엔진 인스턴스 설정
///
/// 프로브용 엔진은 항상 최소 구성(워커 1개, 캐시 비활성화)으로 생성됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 애플리케이션 식별자
    pub application_id: String,
    /// 브로커 주소 목록 (쉼표 구분 `host:port`)
    pub bootstrap_servers: String,
    /// 워커 스레드 수 (항상 1)
    pub num_stream_threads: u32,
    /// 레코드 캐시 크기 (항상 0)
    pub cache_max_bytes_buffering: u64,
    /// 브로커 연결 시도 제한 시간 (밀리초)
    pub connect_timeout_ms: u64,
    /// 종료 대기 제한 시간 (밀리초)
    pub close_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_id: "difc-verifier".to_owned(),
            bootstrap_servers: "localhost:9092".to_owned(),
            num_stream_threads: 1,
            cache_max_bytes_buffering: 0,
            connect_timeout_ms: 1_000,
            close_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    /// 브로커 주소 목록을 반환합니다.
    pub fn broker_addresses(&self) -> Vec<String> {
        self.bootstrap_servers
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// 연결 제한 시간
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// 종료 제한 시간
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// 엔진이 소비하는 키-값 속성 집합으로 변환합니다.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("application.id".to_owned(), self.application_id.clone()),
            (
                "bootstrap.servers".to_owned(),
                self.bootstrap_servers.clone(),
            ),
            (
                "num.stream.threads".to_owned(),
                self.num_stream_threads.to_string(),
            ),
            (
                "cache.max.bytes.buffering".to_owned(),
                self.cache_max_bytes_buffering.to_string(),
            ),
        ])
    }

    /// 엔진 설정의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DifcProbeError> {
        if self.application_id.trim().is_empty() {
            return Err(invalid("engine.application_id", "must not be empty"));
        }

        let brokers = self.broker_addresses();
        if brokers.is_empty() {
            return Err(invalid("engine.bootstrap_servers", "must not be empty"));
        }
        for broker in &brokers {
            validate_broker_address(broker)?;
        }

        if self.num_stream_threads != 1 {
            return Err(invalid(
                "engine.num_stream_threads",
                "probe engines run with exactly one worker thread",
            ));
        }

        if self.cache_max_bytes_buffering != 0 {
            return Err(invalid(
                "engine.cache_max_bytes_buffering",
                "record caching must be disabled (0)",
            ));
        }

        if self.connect_timeout_ms == 0 {
            return Err(invalid("engine.connect_timeout_ms", "must be greater than 0"));
        }

        if self.close_timeout_ms == 0 {
            return Err(invalid("engine.close_timeout_ms", "must be greater than 0"));
        }

        Ok(())
    }
}

/// `host:port` 형식 검증
fn validate_broker_address(addr: &str) -> Result<(), DifcProbeError> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(invalid(
            "engine.bootstrap_servers",
            format!("'{addr}' must be in host:port form"),
        ));
    };
    if host.is_empty() {
        return Err(invalid(
            "engine.bootstrap_servers",
            format!("'{addr}' has an empty host"),
        ));
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid(
            "engine.bootstrap_servers",
            format!("'{addr}' has an invalid port"),
        )),
    }
}

/// 안정화 대기 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// 엔진 상태를 주기적으로 조회하며 RUNNING 도달을 기다림 (기본값)
    #[default]
    Poll,
    /// 고정 시간 동안 대기
    Fixed,
}

impl std::str::FromStr for SettleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(Self::Poll),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::InvalidValue {
                field: "probe.settle_mode".to_owned(),
                reason: format!("unknown settle mode '{other}', expected 'poll' or 'fixed'"),
            }),
        }
    }
}

/// 프로브 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// 기대하는 확장 버전 문자열 (정확히 일치해야 함)
    pub expected_version: String,
    /// 기대하는 확장 플래그 값
    pub expected_enabled: bool,
    /// 비활성 구독에 사용할 토픽 필터 정규식
    pub topic_pattern: String,
    /// 안정화 대기 방식
    pub settle_mode: SettleMode,
    /// 폴링 방식의 최대 대기 시간 (밀리초)
    pub settle_timeout_ms: u64,
    /// 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 고정 방식의 대기 시간 (밀리초)
    pub fixed_settle_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            expected_version: DEFAULT_EXPECTED_VERSION.to_owned(),
            expected_enabled: true,
            topic_pattern: DEFAULT_TOPIC_PATTERN.to_owned(),
            settle_mode: SettleMode::Poll,
            settle_timeout_ms: 10_000,
            poll_interval_ms: 100,
            fixed_settle_ms: 2_000,
        }
    }
}

impl ProbeConfig {
    /// 기대 기준값을 반환합니다.
    pub fn baseline(&self) -> ExpectedBaseline {
        ExpectedBaseline {
            expected_version: self.expected_version.clone(),
            expected_enabled: self.expected_enabled,
        }
    }

    /// 프로브 설정의 유효성을 검증합니다.
    ///
    /// 토픽 패턴 자체의 검증은 토폴로지 빌더가 담당합니다.
    pub fn validate(&self) -> Result<(), DifcProbeError> {
        if self.expected_version.is_empty() {
            return Err(invalid("probe.expected_version", "must not be empty"));
        }

        if self.topic_pattern.is_empty() {
            return Err(invalid("probe.topic_pattern", "must not be empty"));
        }

        if self.settle_timeout_ms == 0 {
            return Err(invalid("probe.settle_timeout_ms", "must be greater than 0"));
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.settle_timeout_ms {
            return Err(invalid(
                "probe.poll_interval_ms",
                format!("must be 1-{}", self.settle_timeout_ms),
            ));
        }

        if self.fixed_settle_ms == 0 {
            return Err(invalid("probe.fixed_settle_ms", "must be greater than 0"));
        }

        Ok(())
    }
}

/// 확장 기능 기대 기준값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedBaseline {
    /// 기대 버전 문자열
    pub expected_version: String,
    /// 기대 플래그 값
    pub expected_enabled: bool,
}

impl Default for ExpectedBaseline {
    fn default() -> Self {
        ProbeConfig::default().baseline()
    }
}

impl ExpectedBaseline {
    /// 관측값이 기준과 정확히 일치하는지 확인합니다.
    pub fn matches(&self, version: &str, enabled: bool) -> bool {
        self.expected_version == version && self.expected_enabled == enabled
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
