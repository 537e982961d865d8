#![doc = include_str!("../README.md")]

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DifcProbeError, EngineError};

// 설정
pub use config::{DifcProbeConfig, EngineConfig, ExpectedBaseline, ProbeConfig, SettleMode};

// 엔진 계약
pub use engine::{Capability, EngineFactory, EngineState, StreamsEngine};

// 도메인 타입
pub use types::{PipelineDescriptor, ProbeResult, SourceNode};
