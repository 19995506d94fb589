use parking_lot::Mutex;
use serde::Serialize;

type CheckFn = Box<dyn Fn(&Healthcheck) + Send + Sync>;

/// Boolean probe. Registrable alongside real metrics but never exported
/// over StatsD; it only shows up in the JSON snapshot.
pub struct Healthcheck {
    error: Mutex<Option<String>>,
    check: CheckFn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthcheckSnapshot {
    pub healthy: bool,
    pub error: Option<String>,
}

impl Healthcheck {
    /// `f` is invoked by `check()` and is expected to call `healthy()` or
    /// `unhealthy()` on the probe it receives.
    pub fn new(f: impl Fn(&Healthcheck) + Send + Sync + 'static) -> Self {
        Self {
            error: Mutex::new(None),
            check: Box::new(f),
        }
    }

    pub fn check(&self) {
        (self.check)(self);
    }

    pub fn healthy(&self) {
        *self.error.lock() = None;
    }

    pub fn unhealthy(&self, err: impl Into<String>) {
        *self.error.lock() = Some(err.into());
    }

    pub fn snapshot(&self) -> HealthcheckSnapshot {
        let error = self.error.lock().clone();
        HealthcheckSnapshot {
            healthy: error.is_none(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn check_drives_state() {
        let up = Arc::new(AtomicBool::new(false));
        let flag = up.clone();
        let hc = Healthcheck::new(move |h| {
            if flag.load(Ordering::SeqCst) {
                h.healthy();
            } else {
                h.unhealthy("baz");
            }
        });

        assert!(hc.snapshot().healthy);
        hc.check();
        assert_eq!(hc.snapshot().error.as_deref(), Some("baz"));
        up.store(true, Ordering::SeqCst);
        hc.check();
        assert!(hc.snapshot().healthy);
    }
}
