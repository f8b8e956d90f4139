use parsync_core::{Strategy, SyncConfig};

/// Turns queue pressure into a target worker count for one of the three strategies.
///
/// Targets are always clamped to `[min_workers, max_workers]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSizing {
    pub min_workers: u32,
    pub max_workers: u32,
    pub cost_high_water: f64,
}

impl PoolSizing {
    pub fn new(config: &SyncConfig, cost_high_water: f64) -> Self {
        Self {
            min_workers: config.min_workers,
            max_workers: config.max_workers.max(config.min_workers),
            cost_high_water,
        }
    }

    /// `source_open` is true while the producer may still deliver batches.
    pub fn target(
        &self,
        strategy: Strategy,
        queue_depth: usize,
        active_workers: u32,
        source_open: bool,
    ) -> u32 {
        let raw = match strategy {
            Strategy::Speed => self.speed(queue_depth, active_workers, source_open),
            Strategy::Cost => self.cost(queue_depth, active_workers),
            Strategy::Balanced => self.balanced(queue_depth),
        };
        raw.clamp(self.min_workers, self.max_workers)
    }

    /// Saturate the pool whenever there is work waiting. A momentarily empty queue holds the
    /// current size until the source is exhausted, so workers are not retired between arrivals.
    fn speed(&self, queue_depth: usize, active_workers: u32, source_open: bool) -> u32 {
        if queue_depth > 0 {
            self.max_workers
        } else if source_open {
            active_workers
        } else {
            self.min_workers
        }
    }

    /// Grow one worker at a time, and only once the backlog per worker passes the high-water mark.
    fn cost(&self, queue_depth: usize, active_workers: u32) -> u32 {
        if active_workers == 0 {
            return self.min_workers;
        }
        let per_worker = queue_depth as f64 / active_workers as f64;
        if per_worker > self.cost_high_water {
            active_workers.saturating_add(1)
        } else if per_worker < 1.0 {
            active_workers.saturating_sub(1)
        } else {
            active_workers
        }
    }

    /// Scale linearly between min and max as the backlog approaches `max_workers` batches.
    fn balanced(&self, queue_depth: usize) -> u32 {
        let span = self.max_workers - self.min_workers;
        if span == 0 || self.max_workers == 0 {
            return self.min_workers;
        }
        let pressure = (queue_depth as f64 / self.max_workers as f64).min(1.0);
        self.min_workers + (span as f64 * pressure).round() as u32
    }
}
