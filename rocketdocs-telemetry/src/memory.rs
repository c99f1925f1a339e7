use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Data for a single captured span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    #[serde(rename = "span_id")]
    pub id: String,
    #[serde(rename = "trace_id")]
    pub trace_id: String,
    pub name: String,
    #[serde(rename = "parent_span_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub start_time: u128,
    pub end_time: Option<u128>,
    // OTLP span kind: 0=Unspecified, 1=Internal, 2=Server, 3=Client, 4=Producer, 5=Consumer
    pub kind: i32,
    pub attributes: HashMap<String, serde_json::Value>,
    pub status: SpanStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpanStatus {
    // 0=Unset, 1=Ok, 2=Error
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// In-memory storage for captured spans, keyed by correlation id
/// (`repo_id` or `doc_id`, whichever the span carries).
#[derive(Debug, Clone, Default)]
pub struct SharedTraceStorage {
    traces: Arc<RwLock<HashMap<String, Vec<SpanData>>>>,
}

impl SharedTraceStorage {
    pub fn new() -> Self {
        Self { traces: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn get_trace(&self, key: &str) -> Option<Vec<SpanData>> {
        self.traces.read().ok()?.get(key).cloned()
    }

    pub fn add_span(&self, key: String, span: SpanData) {
        if let Ok(mut traces) = self.traces.write() {
            traces.entry(key).or_default().push(span);
        }
    }
}

/// A `tracing_subscriber::Layer` that captures every closed span into a
/// [`SharedTraceStorage`], correlated by `repo_id` or `doc_id` field.
pub struct InMemoryTraceLayer {
    storage: Arc<SharedTraceStorage>,
}

impl InMemoryTraceLayer {
    pub fn new(storage: Arc<SharedTraceStorage>) -> Self {
        Self { storage }
    }
}

#[derive(Clone, Default)]
struct SpanFields(HashMap<String, serde_json::Value>);

const CORRELATION_KEYS: [&str; 2] = ["repo_id", "doc_id"];

impl<S> Layer<S> for InMemoryTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let span = ctx.span(id).expect("span not found");
        let mut extensions = span.extensions_mut();

        let start = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        extensions.insert(start);

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields_map = visitor.0;

        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for key in CORRELATION_KEYS {
                    if !fields_map.contains_key(key) {
                        if let Some(val) = parent_fields.0.get(key) {
                            fields_map.insert(key.to_string(), val.clone());
                        }
                    }
                }
            }
        }

        extensions.insert(SpanFields(fields_map));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let span = ctx.span(id).expect("span not found");
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            for (k, v) in visitor.0 {
                fields.0.insert(k, v);
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let span = ctx.span(&id).expect("span not found");
        let extensions = span.extensions();
        let start_time = extensions.get::<u128>().copied().unwrap_or(0);
        let end_time =
            SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos();

        let fields = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();

        let mut keys = Vec::new();
        for key in CORRELATION_KEYS {
            if let Some(v) = fields.get(key).and_then(|v| v.as_str()) {
                keys.push(v.to_string());
            }
        }
        if keys.is_empty() {
            return;
        }

        let trace_id = keys[0].clone();
        let span_data = SpanData {
            id: format!("{:016x}", id.into_u64()),
            trace_id,
            name: span.metadata().name().to_string(),
            parent_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            start_time,
            end_time: Some(end_time),
            kind: 1,
            status: SpanStatus { code: 1, message: None },
            attributes: fields,
        };

        for key in keys {
            self.storage.add_span(key, span_data.clone());
        }
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
