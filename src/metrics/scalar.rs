use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Integer accumulator. Lock-free; a read is its own snapshot.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Last-set integer value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Last-set floating value, stored as its bit pattern.
#[derive(Debug, Default)]
pub struct GaugeFloat {
    bits: AtomicU64,
}

impl GaugeFloat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_goes_both_ways() {
        let c = Counter::new();
        c.inc(47);
        c.dec(19);
        assert_eq!(c.count(), 28);
        c.dec(30);
        assert_eq!(c.count(), -2);
        c.clear();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn gauges_keep_last_value() {
        let g = Gauge::new();
        g.update(19);
        g.update(47);
        assert_eq!(g.value(), 47);

        let gf = GaugeFloat::new();
        assert_eq!(gf.value(), 0.0);
        gf.update(19.2);
        assert_eq!(gf.value(), 19.2);
    }
}
