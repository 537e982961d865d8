#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`topology`]: 실제 토픽과 매칭되지 않는 비활성 토폴로지 빌더
//! - [`settle`]: 엔진 시작 후 안정화 대기 전략 (상태 폴링 / 고정 대기)
//! - [`probe`]: 생명주기 구동, 인트로스펙션, 분류, 정리를 수행하는 능력 프로브
//! - [`report`]: 프로브 실행 보고서
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! TopologyBuilder -> PipelineDescriptor -> EngineFactory::create -> start -> settle
//!                                                                            |
//!                  ProbeReport <- close <- classify <- difc_version / is_difc_enabled
//! ```

pub mod error;
pub mod probe;
pub mod report;
pub mod settle;
pub mod topology;

// --- 주요 타입 re-export ---

// 프로브
pub use probe::{CapabilityProbe, classify_observation, introspect};

// 토폴로지
pub use topology::TopologyBuilder;

// 안정화 대기
pub use settle::{SettleOutcome, SettleProgress, SettleStrategy};

// 보고서
pub use report::{ProbeReport, TeardownStatus};

// 에러
pub use error::ProbeError;
