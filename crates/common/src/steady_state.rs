use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Sliding-window convergence detector.
///
/// Once `capacity` samples are buffered, reports steady when every buffered
/// sample lies within `±tolerance` of the most recent one.
#[derive(Debug, Clone)]
pub struct SteadyStateDetector {
    capacity: usize,
    tolerance: f64,
    window: VecDeque<f64>,
}

impl Default for SteadyStateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TOLERANCE)
    }
}

impl SteadyStateDetector {
    pub fn new(capacity: usize, tolerance: f64) -> Self {
        Self {
            capacity,
            tolerance,
            window: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add_value(&mut self, value: f64) -> bool {
        self.window.push_back(value);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        if self.capacity == 0 || self.window.len() < self.capacity {
            return false;
        }

        let latest = value;
        self.window
            .iter()
            .all(|v| (latest - v).abs() <= self.tolerance)
    }

    /// Buffered samples, oldest first.
    pub fn buffer(&self) -> Vec<f64> {
        self.window.iter().copied().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
