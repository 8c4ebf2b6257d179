//! Shared test support: an in-memory log capture.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// One captured log event, fields flattened to strings.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn message(&self) -> &str {
        self.field("message").unwrap_or("")
    }
}

/// Captures every emitted event for later assertions.
///
/// Install with [`LogCapture::set_default`] and keep the guard alive for
/// the duration of the test; events from the test's (current-thread)
/// runtime land in the capture.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = Registry::default().with(CaptureLayer {
            capture: self.clone(),
        });
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events whose `command` field matches.
    pub fn for_command(&self, command: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.field("command") == Some(command))
            .collect()
    }
}

struct CaptureLayer {
    capture: LogCapture,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldCollector(&mut fields));
        self.capture.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

struct FieldCollector<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldCollector<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}
