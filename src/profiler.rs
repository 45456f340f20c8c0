//! Wall-clock section timing.
//!
//! ```
//! # use grayscott::Profiler;
//! let mut profiler = Profiler::new();
//! {
//!     let _frame = profiler.section("frame");
//!     // timed work
//! }
//! profiler.count("frames", 1);
//! assert_eq!(profiler.summary()["frame"].count, 1);
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    time::{Duration, Instant},
};

/// Named wall-clock samples (milliseconds) and integer counters.
#[derive(Debug, Default, Clone)]
pub struct Profiler {
    sections: BTreeMap<String, Vec<f64>>,
    counters: BTreeMap<String, Vec<i64>>,
}

/// Records the time since its creation into its section when dropped.
#[must_use = "the section is recorded when the guard is dropped"]
pub struct Section<'a> {
    profiler: &'a mut Profiler,
    name: &'a str,
    start: Instant,
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        self.profiler.record(self.name, self.start.elapsed());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    fn of(samples: &[f64]) -> Option<Self> {
        let (&first, rest) = samples.split_first()?;
        let (min, max, sum) = rest
            .iter()
            .fold((first, first, first), |(lo, hi, sum), &x| (lo.min(x), hi.max(x), sum + x));
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / samples.len() as f64;
        Some(Self {
            count: samples.len(),
            mean,
            min,
            max,
        })
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={:<6} mean={:>9.3}ms min={:>9.3}ms max={:>9.3}ms",
            self.count, self.mean, self.min, self.max
        )
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing `name` until the returned guard is dropped.
    pub fn section<'a>(&'a mut self, name: &'a str) -> Section<'a> {
        Section {
            profiler: self,
            name,
            start: Instant::now(),
        }
    }

    /// Adds one sample to `name`.
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1e3;
        match self.sections.get_mut(name) {
            Some(samples) => samples.push(ms),
            None => {
                self.sections.insert(name.to_owned(), vec![ms]);
            }
        }
    }

    pub fn count(&mut self, name: &str, value: i64) {
        self.counters.entry(name.to_owned()).or_default().push(value);
    }

    /// Section samples in milliseconds.
    pub fn measurements(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.sections
    }

    pub fn counters(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.counters
    }

    pub fn summary(&self) -> BTreeMap<&str, Stats> {
        self.sections
            .iter()
            .filter_map(|(name, samples)| Some((name.as_str(), Stats::of(samples)?)))
            .collect()
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, stats) in self.summary() {
            writeln!(f, "{name:<16} {stats}")?;
        }
        for (name, values) in &self.counters {
            writeln!(f, "{name:<16} total={}", values.iter().sum::<i64>())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_record_on_drop() {
        let mut p = Profiler::new();
        for _ in 0..3 {
            let _s = p.section("work");
            std::thread::sleep(Duration::from_millis(2));
        }
        let samples = &p.measurements()["work"];
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|&ms| ms >= 2.0));
    }

    #[test]
    fn summary_statistics() {
        let mut p = Profiler::new();
        for ms in [4, 1, 7] {
            p.record("step", Duration::from_millis(ms));
        }
        let stats = p.summary()["step"];
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 4.0).abs() < 1e-9);
        assert!((stats.min - 1.0).abs() < 1e-9);
        assert!((stats.max - 7.0).abs() < 1e-9);
    }

    #[test]
    fn counters_accumulate() {
        let mut p = Profiler::new();
        p.count("cells", 10);
        p.count("cells", 5);
        assert_eq!(p.counters()["cells"], vec![10, 5]);
        assert!(p.summary().is_empty());
        assert!(p.to_string().contains("total=15"));
    }
}
