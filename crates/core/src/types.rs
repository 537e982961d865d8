//! 도메인 타입: 토폴로지 기술자와 프로브 분류 결과
//!
//! [`PipelineDescriptor`]는 엔진에 전달되는 불변 토폴로지 기술이며,
//! [`ProbeResult`]는 한 번의 프로브 실행이 내리는 최종 분류입니다.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 소스 노드 이름 (엔진의 자동 생성 이름 규칙을 따름)
const SOURCE_NODE_NAME: &str = "KSTREAM-SOURCE-0000000000";

/// 패턴 구독 소스 노드
#[derive(Debug, Clone)]
pub struct SourceNode {
    /// 노드 이름
    name: String,
    /// 토픽 이름 필터
    pattern: Regex,
}

impl SourceNode {
    /// 노드 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 토픽 이름 필터를 반환합니다.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// 처리 토폴로지 기술자
///
/// 정확히 하나의 패턴 구독 소스로 구성되며 변환/집계/출력 단계는 없습니다.
/// 생성 이후 변경할 수 없습니다.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    source: SourceNode,
}

impl PipelineDescriptor {
    /// 단일 패턴 구독 소스로 기술자를 생성합니다.
    pub fn from_pattern(pattern: Regex) -> Self {
        Self {
            source: SourceNode {
                name: SOURCE_NODE_NAME.to_owned(),
                pattern,
            },
        }
    }

    /// 구독 소스를 반환합니다.
    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    /// 소스 패턴 문자열을 반환합니다.
    pub fn pattern_str(&self) -> &str {
        self.source.pattern.as_str()
    }

    /// 주어진 토픽 이름이 구독 필터에 매칭되는지 확인합니다.
    pub fn matches(&self, topic: &str) -> bool {
        self.source.pattern.is_match(topic)
    }

    /// 사람이 읽을 수 있는 토폴로지 설명을 생성합니다.
    pub fn describe(&self) -> String {
        format!(
            "Topologies:\n   Sub-topology: 0\n    Source: {} (topics: [pattern {}])\n      --> none\n",
            self.source.name,
            self.source.pattern.as_str()
        )
    }
}

impl fmt::Display for PipelineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// 프로브 분류 결과
///
/// 확장 기능의 세 가지 상태(정상/불일치/부재)와 그 밖의 런타임 실패를 구분합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResult {
    /// 기대한 버전과 플래그를 보고함
    Confirmed { version: String },
    /// 인트로스펙션은 성공했지만 기대값과 다름
    Mismatch { version: String, enabled: bool },
    /// 확장 인트로스펙션 연산이 존재하지 않음
    Absent { detail: String },
    /// 확장 부재로 볼 수 없는 그 밖의 실패
    RuntimeFailure { detail: String },
}

impl ProbeResult {
    /// 확장 기능이 확인되었는지 여부
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// 분류 이름을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Mismatch { .. } => "mismatch",
            Self::Absent { .. } => "absent",
            Self::RuntimeFailure { .. } => "runtime_failure",
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { version } => write!(f, "confirmed: {version}"),
            Self::Mismatch { version, enabled } => {
                write!(f, "mismatch: version=\"{version}\" enabled={enabled}")
            }
            Self::Absent { detail } => write!(f, "absent: {detail}"),
            Self::RuntimeFailure { detail } => write!(f, "runtime failure: {detail}"),
        }
    }
}
