//! 비활성 토폴로지 빌더
//!
//! 엔진은 비어 있지 않은 토폴로지가 있어야 시작할 수 있습니다. [`TopologyBuilder`]는
//! 실제 토픽과 절대 매칭되지 않는 패턴 구독 하나만으로 토폴로지를 구성하여,
//! 프로브 실행 중 어떤 데이터도 처리되지 않도록 합니다.
//!
//! # 사용 예시
//! ```
//! use difcprobe_probe::topology::{self, TopologyBuilder};
//!
//! // 기본 예약 패턴 (실패하지 않음)
//! let descriptor = topology::build();
//! assert!(!descriptor.matches("orders"));
//!
//! // 설정으로 지정한 패턴 (검증 후 생성)
//! let descriptor = TopologyBuilder::with_pattern(r"^__probe_dummy_topic_\d+$")
//!     .try_build()
//!     .unwrap();
//! assert!(descriptor.matches("__probe_dummy_topic_7"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use difcprobe_core::config::{DEFAULT_TOPIC_PATTERN, ProbeConfig};
use difcprobe_core::types::PipelineDescriptor;

use crate::error::ProbeError;

/// 예약 토픽 이름 접두사
pub const RESERVED_TOPIC_PREFIX: &str = "__";

/// 사용자 지정 패턴이 매칭해서는 안 되는 대표적인 실제 토픽 이름
pub const REPRESENTATIVE_TOPICS: &[&str] = &[
    "orders",
    "payments",
    "payments-v2",
    "customers",
    "inventory.events",
    "__consumer_offsets",
    "__transaction_state",
    "_schemas",
    "connect-configs",
    "connect-offsets",
    "connect-status",
    "difc-verifier-KSTREAM-AGGREGATE-STATE-STORE-0000000001-changelog",
];

static DEFAULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_TOPIC_PATTERN).expect("default topic pattern is a valid regex")
});

/// 기본 예약 패턴으로 비활성 토폴로지를 생성합니다.
///
/// 입출력이 없는 순수 함수입니다.
pub fn build() -> PipelineDescriptor {
    PipelineDescriptor::from_pattern(DEFAULT_PATTERN.clone())
}

/// 토폴로지 빌더
///
/// 운영자가 패턴을 지정할 수 있으므로 [`try_build`](Self::try_build)에서
/// 앵커와 예약 접두사를 검사합니다.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    pattern: String,
}

impl TopologyBuilder {
    /// 기본 예약 패턴을 사용하는 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_TOPIC_PATTERN.to_owned(),
        }
    }

    /// 지정한 패턴을 사용하는 빌더를 생성합니다.
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// 프로브 설정의 `topic_pattern`을 사용하는 빌더를 생성합니다.
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::with_pattern(config.topic_pattern.clone())
    }

    /// 현재 패턴 문자열
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 패턴을 검증하고 토폴로지를 생성합니다.
    ///
    /// # 검증 규칙
    /// - `^`로 시작하고 `$`로 끝나야 함
    /// - `^` 직후가 예약 접두사 `__`여야 함
    /// - 최상위 `|` 대안이나 내부 앵커가 없어야 함 (모든 매칭이 `__`로 시작)
    /// - 정규식으로 컴파일 가능해야 함
    /// - [`REPRESENTATIVE_TOPICS`] 중 어느 것과도 매칭되지 않아야 함
    pub fn try_build(&self) -> Result<PipelineDescriptor, ProbeError> {
        let pattern = self.pattern.as_str();

        if !pattern.starts_with('^') || !pattern.ends_with('$') {
            return Err(self.reject("must be anchored with '^' and '$'"));
        }

        let body = &pattern[1..pattern.len() - 1];
        if !body.starts_with(RESERVED_TOPIC_PREFIX) {
            return Err(self.reject(format!(
                "must start with the reserved prefix '{RESERVED_TOPIC_PREFIX}'"
            )));
        }

        if let Some(reason) = scan_body(body) {
            return Err(self.reject(reason));
        }

        let regex = Regex::new(pattern).map_err(|e| self.reject(e.to_string()))?;

        if let Some(topic) = REPRESENTATIVE_TOPICS.iter().find(|t| regex.is_match(t)) {
            return Err(self.reject(format!("matches real topic name '{topic}'")));
        }

        debug!(pattern, "built inert topology");
        Ok(PipelineDescriptor::from_pattern(regex))
    }

    fn reject(&self, reason: impl Into<String>) -> ProbeError {
        ProbeError::Topology {
            pattern: self.pattern.clone(),
            reason: reason.into(),
        }
    }
}

/// 앵커 사이 본문에서 예약 접두사를 우회할 수 있는 구문을 찾습니다.
///
/// 이스케이프된 문자와 문자 클래스 내부는 건너뜁니다.
fn scan_body(body: &str) -> Option<&'static str> {
    let mut chars = body.chars().peekable();
    let mut group_depth: i32 = 0;
    let mut class_depth: u32 = 0;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => {
                class_depth += 1;
                // 클래스 맨 앞의 `^`와 `]`는 리터럴
                if chars.peek() == Some(&'^') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
            }
            ']' if class_depth > 0 => class_depth -= 1,
            _ if class_depth > 0 => {}
            '(' => group_depth += 1,
            ')' => group_depth -= 1,
            '|' if group_depth <= 0 => return Some("must not use top-level alternation"),
            '^' | '$' => return Some("must not contain anchors between '^' and '$'"),
            _ => {}
        }
    }
    None
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
