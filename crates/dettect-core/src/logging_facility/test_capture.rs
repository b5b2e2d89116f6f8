//! In-memory event capture for logging assertions
//!
//! One global subscriber is installed per test binary. Tests run in
//! parallel against it, so assertions select their own events by a unique
//! op name or by `invocation_id`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Visit for Fields {
    // Numbers and bools arrive here through the default `record_*` methods
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

type Events = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(Events);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let Fields(fields) = fields;

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: fields.get("op").cloned(),
            event: fields.get("event").cloned(),
            fields,
        };
        if let Ok(mut events) = self.0.lock() {
            events.push(captured);
        }
    }
}

/// Handle on the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Events,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events carrying `key = value`, in emission order
    pub fn events_with_field(&self, key: &str, value: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.field(key) == Some(value))
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture subscriber on first use and return its handle
///
/// # Example
///
/// ```
/// use dettect_core::logging_facility::test_capture::init_test_capture;
/// use dettect_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_example_op");
/// assert_eq!(capture.events_with_field("op", "doc_example_op").len(), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Events::default();
            tracing_subscriber::registry()
                .with(CaptureLayer(events.clone()))
                .init();
            TestCapture { events }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_with_field_keeps_emission_order() {
        let capture = init_test_capture();
        tracing::info!(capture_key = "unit_1", order = 1u64);
        tracing::warn!(capture_key = "unit_1", order = 2u64);
        tracing::info!(capture_key = "unit_other", order = 3u64);

        let events = capture.events_with_field("capture_key", "unit_1");
        let order: Vec<Option<&str>> = events.iter().map(|e| e.field("order")).collect();
        assert_eq!(order, vec![Some("1"), Some("2")]);
        assert_eq!(events[1].level, Level::WARN);
        assert_eq!(events[0].op, None);
    }
}
