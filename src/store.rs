// Canonical ordered sample sequence: wholesale replace on ingestion, windowed append while streaming

use std::collections::VecDeque;

use crate::models::{Sample, TimeRange};

#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    samples: VecDeque<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole sequence (new upload or demo data).
    pub fn replace(&mut self, samples: Vec<Sample>) {
        self.samples = samples.into();
    }

    /// Appends one sample, then drops the oldest entries so `len() <= capacity`.
    /// The only mutation path that removes data.
    pub fn append_windowed(&mut self, sample: Sample, capacity: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn all(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    /// Samples with `start <= timestamp <= end`, in store order. Unbounded range → everything.
    pub fn filter(&self, range: &TimeRange) -> Vec<Sample> {
        if range.is_unbounded() {
            return self.all();
        }
        self.samples
            .iter()
            .filter(|s| range.contains(&s.timestamp))
            .cloned()
            .collect()
    }
}
