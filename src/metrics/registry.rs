use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Metric, MetricSnapshot};
use crate::error::{ExporterError, Result};

/// Read-only view of a set of named metrics, as seen by the exporter.
///
/// `entries()` must release any internal lock before returning; the
/// exporter snapshots each entry afterwards through [`Metric::snapshot`],
/// which is internally consistent even under concurrent writers.
pub trait MetricSource: Send + Sync {
    fn entries(&self) -> Vec<(String, Metric)>;
}

/// Thread-safe name → metric map.
///
/// Producers hold their own `Arc` handles and update them without touching
/// the registry lock; the lock only guards membership.
#[derive(Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `name` is already taken.
    pub fn register(&self, name: impl Into<String>, metric: impl Into<Metric>) -> Result<()> {
        let name = name.into();
        let mut map = self.metrics.write();
        if map.contains_key(&name) {
            return Err(ExporterError::DuplicateMetric(name));
        }
        map.insert(name, metric.into());
        Ok(())
    }

    /// Return the existing metric under `name`, or register the one `make`
    /// builds. The existing entry wins even if it is of another kind.
    pub fn get_or_register(&self, name: &str, make: impl FnOnce() -> Metric) -> Metric {
        if let Some(m) = self.metrics.read().get(name) {
            return m.clone();
        }
        self.metrics
            .write()
            .entry(name.to_owned())
            .or_insert_with(make)
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.write().remove(name)
    }

    pub fn unregister_all(&self) {
        self.metrics.write().clear();
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Snapshot of every registered metric, in name order.
    pub fn snapshot(&self) -> BTreeMap<String, MetricSnapshot> {
        self.entries()
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }
}

impl MetricSource for Registry {
    fn entries(&self) -> Vec<(String, Metric)> {
        self.metrics
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<T: MetricSource + ?Sized> MetricSource for Arc<T> {
    fn entries(&self) -> Vec<(String, Metric)> {
        (**self).entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Counter, Gauge};

    #[test]
    fn duplicate_names_are_rejected() {
        let r = Registry::new();
        r.register("requests", Arc::new(Counter::new())).unwrap();
        let err = r.register("requests", Arc::new(Gauge::new())).unwrap_err();
        assert!(matches!(err, ExporterError::DuplicateMetric(n) if n == "requests"));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn get_or_register_keeps_first() {
        let r = Registry::new();
        let first = Arc::new(Counter::new());
        first.inc(3);
        r.register("c", first).unwrap();

        let got = r.get_or_register("c", || Metric::Counter(Arc::new(Counter::new())));
        assert_eq!(got.snapshot(), MetricSnapshot::Counter { count: 3 });
    }

    #[test]
    fn entries_see_membership_changes() {
        let r = Registry::new();
        r.register("b", Arc::new(Counter::new())).unwrap();
        r.register("a", Arc::new(Gauge::new())).unwrap();
        let names: Vec<_> = r.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);

        assert!(r.unregister("a").is_some());
        assert_eq!(r.entries().len(), 1);
        r.unregister_all();
        assert!(r.is_empty());
    }

    #[test]
    fn handles_update_without_reregistering() {
        let r = Registry::new();
        let c = Arc::new(Counter::new());
        r.register("hits", c.clone()).unwrap();
        c.inc(42);
        assert_eq!(
            r.snapshot().get("hits"),
            Some(&MetricSnapshot::Counter { count: 42 })
        );
    }
}
