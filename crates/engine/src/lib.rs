#![doc = include_str!("../README.md")]

pub mod local;

// 참조 엔진
pub use local::{LocalEngineFactory, LocalStreamsEngine};

/// DIFC 확장 빌드가 보고하는 버전 문자열
pub const DIFC_VERSION: &str = "DIFC-Enabled-Kafka-4.0.0";

/// 이 빌드에 DIFC 확장이 포함되었는지 여부
pub const EXTENSION_COMPILED: bool = cfg!(feature = "difc");

/// 빌드 종류 이름 (`"difc"` 또는 `"standard"`)
pub fn build_flavor() -> &'static str {
    if EXTENSION_COMPILED { "difc" } else { "standard" }
}
