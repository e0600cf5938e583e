//! Run cache of the selected process.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::source::Run;

/// Runs of one process keyed by name, iterated in the order the service
/// listed them.
#[derive(Debug, Default)]
pub struct RunCache {
    order: Vec<String>,
    runs: HashMap<String, Run>,
    updated_at: Option<Instant>,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fresh run list.
    pub fn replace(&mut self, runs: Vec<Run>) {
        self.order.clear();
        self.runs.clear();
        for run in runs {
            if !self.runs.contains_key(&run.name) {
                self.order.push(run.name.clone());
            }
            self.runs.insert(run.name.clone(), run);
        }
        self.updated_at = Some(Instant::now());
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.runs.clear();
        self.updated_at = None;
    }

    /// Merge one refreshed run.
    ///
    /// Runs that are no longer cached are not re-inserted, and a cached
    /// terminal run is never replaced by a non-terminal one. Returns whether
    /// the cache changed.
    pub fn merge(&mut self, run: Run) -> bool {
        let Some(cached) = self.runs.get_mut(&run.name) else {
            return false;
        };
        if cached.is_terminal() && !run.is_terminal() {
            return false;
        }
        self.updated_at = Some(Instant::now());
        if *cached == run {
            return false;
        }
        *cached = run;
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Run> {
        self.order.retain(|n| n != name);
        self.runs.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Run> {
        self.runs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runs.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Run> {
        self.order.iter().filter_map(|name| self.runs.get(name))
    }

    /// Names of runs whose status is not terminal.
    pub fn pending(&self) -> Vec<String> {
        self.iter()
            .filter(|run| !run.is_terminal())
            .map(|run| run.name.clone())
            .collect()
    }

    /// Count of runs per status label, in first-seen order.
    pub fn status_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for run in self.iter() {
            let label = run.status.as_str();
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label.to_string(), 1)),
            }
        }
        counts
    }

    /// When the cache last received data from the service.
    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
