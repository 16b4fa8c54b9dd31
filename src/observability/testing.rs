//! In-memory span capture for unit tests.

use opentelemetry::Value;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

use crate::observability::Tracer;

/// Finished spans captured by a test tracer.
#[derive(Debug, Clone)]
pub(crate) struct SpanRecorder {
    exporter: InMemorySpanExporter,
    /// Keeps the provider alive: dropping its last handle shuts the exporter
    /// down, which clears the captured spans.
    _provider: SdkTracerProvider,
}

/// A tracer exporting synchronously into memory.
pub(crate) fn recording_tracer(verbose: bool) -> (Tracer, SpanRecorder) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let recorder = SpanRecorder {
        exporter,
        _provider: provider.clone(),
    };
    (Tracer::new(verbose, provider), recorder)
}

impl SpanRecorder {
    /// All spans ended so far, in end order.
    pub(crate) fn spans(&self) -> Vec<SpanData> {
        self.exporter.get_finished_spans().expect("span exporter poisoned")
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.spans().into_iter().map(|s| s.name.into_owned()).collect()
    }

    pub(crate) fn find(&self, name: &str) -> Option<SpanData> {
        self.spans().into_iter().find(|s| s.name == name)
    }
}

pub(crate) trait SpanDataExt {
    fn attr(&self, key: &str) -> Option<&Value>;
    fn is_error(&self) -> bool;
    fn has_event(&self, name: &str) -> bool;
    fn event_names(&self) -> Vec<String>;
    fn event_value(&self, key: &str) -> Option<String>;
}

impl SpanDataExt for SpanData {
    fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    /// Tagged `error=true`.
    fn is_error(&self) -> bool {
        self.attr("error") == Some(&Value::Bool(true))
    }

    fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|e| e.name.to_string()).collect()
    }

    /// Value of the first event attribute named `key`.
    fn event_value(&self, key: &str) -> Option<String> {
        self.events.iter().find_map(|e| {
            e.attributes
                .iter()
                .find(|kv| kv.key.as_str() == key)
                .map(|kv| kv.value.as_str().into_owned())
        })
    }
}
