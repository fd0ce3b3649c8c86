use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem;
use std::ops::Index;

/// Named scalar counters an environment accumulates for external consumers
#[derive(Debug, Clone, Default)]
pub struct Report {
    data: HashMap<&'static str, f64>,
}

impl Report {
    /// Initialize every counter in `keys` to zero
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self {
            data: keys.into_iter().map(|k| (k, 0.0)).collect(),
        }
    }

    /// Entry API over a counter, mirroring [`HashMap::entry`]
    pub fn entry(&mut self, key: &'static str) -> Entry<'_, &'static str, f64> {
        self.data.entry(key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.data.keys().copied().collect()
    }

    /// Drain the counters, resetting them all to zero
    pub fn take(&mut self) -> HashMap<&'static str, f64> {
        let fresh = self.data.keys().map(|&k| (k, 0.0)).collect();
        mem::replace(&mut self.data, fresh)
    }
}

impl Index<&str> for Report {
    type Output = f64;

    fn index(&self, key: &str) -> &Self::Output {
        &self.data[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_drain() {
        let mut report = Report::new(vec!["reward", "steps"]);
        report.entry("steps").and_modify(|x| *x += 1.0);
        report.entry("steps").and_modify(|x| *x += 1.0);
        report.entry("reward").and_modify(|x| *x -= 0.5);
        assert_eq!(report["steps"], 2.0);
        assert_eq!(report["reward"], -0.5);

        let drained = report.take();
        assert_eq!(*drained.get("steps").unwrap(), 2.0);
        assert_eq!(report["steps"], 0.0);
    }
}
