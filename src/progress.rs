//! Coarse percentage progress reporting

/// Logs how far through `total` steps a loop is, at most once per `step`
/// percent. The opening 0% is only logged at debug level.
#[derive(Debug)]
pub struct Percent {
    total: usize,
    step: usize,
    next: usize,
}

impl Percent {
    pub fn new(total: usize, step: usize) -> Self {
        Self {
            total,
            step: step.clamp(1, 100),
            next: 0,
        }
    }

    /// Percentage that will be logged next
    pub fn next_report(&self) -> usize {
        self.next
    }

    /// Notes that `done` steps are complete and returns the percentage
    /// logged, if any
    pub fn update(&mut self, done: usize) -> Option<usize> {
        let percent = if self.total == 0 {
            100
        } else {
            (done.min(self.total) * 100) / self.total
        };

        if percent < self.next {
            return None;
        }

        if percent == 0 {
            log::debug!("{:3}%", percent);
        } else {
            log::info!("{:3}%", percent);
        }
        self.next = (percent / self.step + 1) * self.step;
        Some(percent)
    }

    /// Reports completion unless 100% was already logged
    pub fn finish(&mut self) -> Option<usize> {
        self.update(self.total)
    }
}
