//! Pipeline event sink.
//!
//! Stages report progress as leveled [`PipelineEvent`]s through an injected
//! [`PipelineObserver`]. Observers are purely observational: `on_event`
//! returns nothing and implementations must not panic.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Severity / kind of a pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
    /// A stage is starting
    Step,
    /// A stage finished; `duration` is set
    Timing,
}

/// A single observable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub level: EventLevel,

    /// Short headline, e.g. "Intent Classification"
    pub message: String,

    /// Optional detail line
    #[serde(default)]
    pub details: Option<String>,

    /// Elapsed time for [`EventLevel::Timing`] events
    #[serde(default)]
    pub duration: Option<Duration>,
}

impl PipelineEvent {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            details: None,
            duration: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Debug, message)
    }

    pub fn step(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Step, message)
    }

    /// Timing event for a completed operation.
    pub fn timing(operation: impl Into<String>, duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::new(EventLevel::Timing, operation)
        }
    }

    /// Attach a detail line.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Receiver of pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        let details = event.details.as_deref().unwrap_or("");
        match event.level {
            EventLevel::Info => tracing::info!(details, "{}", event.message),
            EventLevel::Success => tracing::info!(details, success = true, "{}", event.message),
            EventLevel::Warning => tracing::warn!(details, "{}", event.message),
            EventLevel::Error => tracing::error!(details, "{}", event.message),
            EventLevel::Debug => tracing::debug!(details, "{}", event.message),
            EventLevel::Step => tracing::info!(details, step = true, "{}", event.message),
            EventLevel::Timing => {
                let elapsed_ms = event.duration.map(|d| d.as_millis() as u64).unwrap_or(0);
                tracing::debug!(elapsed_ms, "{} completed", event.message)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in emission order.
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of recorded events at the given level whose message matches exactly.
    pub fn count(&self, level: EventLevel, message: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.level == level && e.message == message)
            .count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&PipelineEvent::step("Intent Classification"));
        observer.on_event(&PipelineEvent::success("Done").with_details("Intent: Misc Mode"));
        observer.on_event(&PipelineEvent::timing("Intent Classification", Duration::from_millis(5)));

        let events = observer.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].level, EventLevel::Step);
        assert_eq!(events[1].details.as_deref(), Some("Intent: Misc Mode"));
        assert_eq!(events[2].duration, Some(Duration::from_millis(5)));
        assert_eq!(observer.count(EventLevel::Step, "Intent Classification"), 1);
    }

    #[test]
    fn test_tracing_and_noop_observers_accept_all_levels() {
        let levels = [
            EventLevel::Info,
            EventLevel::Success,
            EventLevel::Warning,
            EventLevel::Error,
            EventLevel::Debug,
            EventLevel::Step,
            EventLevel::Timing,
        ];
        for level in levels {
            let event = PipelineEvent::new(level, "event");
            TracingObserver.on_event(&event);
            NoopObserver.on_event(&event);
        }
    }
}
