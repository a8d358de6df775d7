//! Metrics sampling subsystem: a ring buffer per named metric. The core
//! only owns storage and the query surface the control server answers;
//! sampling *policy* (when to record, ring size per metric) is
//! configured by the caller.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single scalar value recorded for a metric at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum MetricValue {
    Int(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl MetricValue {
    /// Numeric projection used by `tasks_committed`/`results_error`-style
    /// counters that increment in place.
    pub fn as_f64(&self) -> Result<f64, CoreError> {
        match self {
            MetricValue::Int(v) => Ok(*v as f64),
            MetricValue::Float(v) => Ok(*v as f64),
            MetricValue::Double(v) => Ok(*v),
            MetricValue::Text(_) | MetricValue::Bytes(_) => {
                Err(CoreError::NotNumeric("non-numeric metric value".into()))
            }
        }
    }
}

struct Ring {
    capacity: usize,
    values: Vec<MetricValue>,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), values: Vec::new() }
    }

    fn push(&mut self, value: MetricValue) {
        if self.values.len() == self.capacity {
            self.values.remove(0);
        }
        self.values.push(value);
    }

    fn last(&self) -> Option<&MetricValue> {
        self.values.last()
    }
}

/// A named ring-buffer metric store, shared by every native-library role
/// ("Metrics handle lifecycle": create once per process,
/// destroy last, pass to every `*_new` call).
pub struct MetricsStore {
    default_capacity: usize,
    rings: Mutex<HashMap<String, Ring>>,
}

impl MetricsStore {
    pub fn new(default_capacity: usize) -> Self {
        Self { default_capacity, rings: Mutex::new(HashMap::new()) }
    }

    /// Records a new value for `name`. Accumulates onto the prior value
    /// when both it and the new value are numeric.
    pub fn set(&self, name: &str, value: MetricValue) {
        let mut rings = self.rings.lock();
        let cap = self.default_capacity;
        rings.entry(name.to_string()).or_insert_with(|| Ring::new(cap)).push(value);
    }

    /// Increments a numeric counter metric, creating it at 0 if absent.
    /// Used for `tasks_committed`, `results_error`, `tasks_processed`, etc.
    pub fn increment(&self, name: &str, by: i64) {
        let mut rings = self.rings.lock();
        let cap = self.default_capacity;
        let ring = rings.entry(name.to_string()).or_insert_with(|| Ring::new(cap));
        let current = match ring.last() {
            Some(MetricValue::Int(v)) => *v,
            _ => 0,
        };
        ring.push(MetricValue::Int(current + by));
    }

    pub fn last(&self, name: &str) -> Option<MetricValue> {
        self.rings.lock().get(name).and_then(Ring::last).cloned()
    }

    pub fn history(&self, name: &str) -> Vec<MetricValue> {
        self.rings.lock().get(name).map(|r| r.values.clone()).unwrap_or_default()
    }

    /// Schema for `QUERY_METRICS_LIST`: names and the number
    /// of samples currently retained.
    pub fn list(&self) -> Vec<(String, usize)> {
        self.rings.lock().iter().map(|(name, ring)| (name.clone(), ring.values.len())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest() {
        let store = MetricsStore::new(2);
        store.set("m", MetricValue::Int(1));
        store.set("m", MetricValue::Int(2));
        store.set("m", MetricValue::Int(3));
        assert_eq!(store.history("m"), vec![MetricValue::Int(2), MetricValue::Int(3)]);
    }

    #[test]
    fn increment_accumulates() {
        let store = MetricsStore::new(8);
        store.increment("tasks_committed", 1);
        store.increment("tasks_committed", 1);
        assert_eq!(store.last("tasks_committed"), Some(MetricValue::Int(2)));
    }

    #[test]
    fn non_numeric_rejects_as_f64() {
        let v = MetricValue::Text("x".into());
        assert!(v.as_f64().is_err());
    }
}
