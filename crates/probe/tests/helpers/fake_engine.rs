//! Fake engine collaborator for capability probe tests.
//!
//! Records every lifecycle and introspection call so tests can assert
//! call counts and ordering, and supports failure injection at each step.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use difcprobe_core::config::EngineConfig;
use difcprobe_core::engine::{Capability, EngineFactory, EngineState, StreamsEngine};
use difcprobe_core::error::EngineError;
use difcprobe_core::types::PipelineDescriptor;

/// Shared record of calls made against fake engines.
#[derive(Default)]
pub struct CallLog {
    creates: AtomicUsize,
    starts: AtomicUsize,
    closes: AtomicUsize,
    version_calls: AtomicUsize,
    flag_calls: AtomicUsize,
    events: Mutex<Vec<&'static str>>,
}

#[allow(dead_code)]
impl CallLog {
    fn record(&self, counter: &AtomicUsize, event: &'static str) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.events.lock().expect("event log poisoned").push(event);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn flag_calls(&self) -> usize {
        self.flag_calls.load(Ordering::SeqCst)
    }

    pub fn introspection_calls(&self) -> usize {
        self.version_calls() + self.flag_calls()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("event log poisoned").clone()
    }
}

/// How the fake engine answers the extension introspection calls.
#[derive(Clone)]
#[allow(dead_code)]
pub enum Introspection {
    /// Extension present, reporting these values.
    Extension { version: String, enabled: bool },
    /// Build negotiates the operations as unsupported.
    Missing,
    /// Build raises `UnsupportedOperation` from both calls.
    Raising,
    /// Version call succeeds, flag call raises `UnsupportedOperation`.
    FlagRaising { version: String },
    /// Version call fails with a generic fault.
    Faulty(String),
}

/// Failure injection and behavior knobs for [`FakeFactory`].
#[derive(Clone)]
pub struct FakeBehavior {
    pub create_error: Option<EngineError>,
    pub start_error: Option<EngineError>,
    pub close_error: Option<EngineError>,
    /// State the engine reports after `start()`.
    pub state_after_start: EngineState,
    pub introspection: Introspection,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            create_error: None,
            start_error: None,
            close_error: None,
            state_after_start: EngineState::Running,
            introspection: Introspection::Missing,
        }
    }
}

/// Factory producing [`FakeEngine`] instances that share one [`CallLog`].
pub struct FakeFactory {
    behavior: FakeBehavior,
    log: Arc<CallLog>,
}

#[allow(dead_code)]
impl FakeFactory {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Engine implementing the extension with the given values.
    pub fn with_extension(version: &str, enabled: bool) -> Self {
        Self::new(FakeBehavior {
            introspection: Introspection::Extension {
                version: version.to_owned(),
                enabled,
            },
            ..FakeBehavior::default()
        })
    }

    /// Engine whose introspection calls raise `UnsupportedOperation`.
    pub fn raising_unsupported() -> Self {
        Self::new(FakeBehavior {
            introspection: Introspection::Raising,
            ..FakeBehavior::default()
        })
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn create(
        &self,
        _topology: &PipelineDescriptor,
        _config: &EngineConfig,
    ) -> Result<FakeEngine, EngineError> {
        self.log.record(&self.log.creates, "create");
        if let Some(err) = &self.behavior.create_error {
            return Err(err.clone());
        }
        Ok(FakeEngine {
            behavior: self.behavior.clone(),
            log: Arc::clone(&self.log),
            state: EngineState::Created,
        })
    }
}

/// Fake engine instance.
pub struct FakeEngine {
    behavior: FakeBehavior,
    log: Arc<CallLog>,
    state: EngineState,
}

impl StreamsEngine for FakeEngine {
    fn state(&self) -> EngineState {
        self.state
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        self.log.record(&self.log.starts, "start");
        if let Some(err) = &self.behavior.start_error {
            self.state = EngineState::Error;
            return Err(err.clone());
        }
        self.state = self.behavior.state_after_start;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.log.record(&self.log.closes, "close");
        self.state = EngineState::NotRunning;
        match &self.behavior.close_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn difc_version(&self) -> Result<Capability<String>, EngineError> {
        self.log.record(&self.log.version_calls, "difc_version");
        match &self.behavior.introspection {
            Introspection::Extension { version, .. } | Introspection::FlagRaising { version } => {
                Ok(Capability::Supported(version.clone()))
            }
            Introspection::Missing => Ok(Capability::Unsupported),
            Introspection::Raising => Err(EngineError::UnsupportedOperation {
                operation: "difc_version".to_owned(),
            }),
            Introspection::Faulty(reason) => Err(EngineError::Introspection {
                operation: "difc_version".to_owned(),
                reason: reason.clone(),
            }),
        }
    }

    fn is_difc_enabled(&self) -> Result<Capability<bool>, EngineError> {
        self.log.record(&self.log.flag_calls, "is_difc_enabled");
        match &self.behavior.introspection {
            Introspection::Extension { enabled, .. } => Ok(Capability::Supported(*enabled)),
            Introspection::Missing => Ok(Capability::Unsupported),
            Introspection::Raising | Introspection::FlagRaising { .. } => {
                Err(EngineError::UnsupportedOperation {
                    operation: "is_difc_enabled".to_owned(),
                })
            }
            Introspection::Faulty(reason) => Err(EngineError::Introspection {
                operation: "is_difc_enabled".to_owned(),
                reason: reason.clone(),
            }),
        }
    }
}
