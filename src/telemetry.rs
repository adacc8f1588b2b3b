// Rate-limited controller debug output
//
// The control loop runs far faster than anyone can read logs, so only every
// Nth snapshot is emitted.

use tracing::debug;

use crate::messages::ControllerDebug;

/// Lets one call in `every` through
#[derive(Debug, Clone)]
pub struct DebugSampler {
    every: u32,
    count: u32,
}

impl DebugSampler {
    /// `every` of 0 is treated as 1 (emit every call)
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }

    /// Count one call; true on every `every`-th call
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Log the snapshot if this call is due. Returns it when logged.
    pub fn sample(&mut self, snapshot: ControllerDebug) -> Option<ControllerDebug> {
        if !self.tick() {
            return None;
        }

        debug!(
            "O: {:.3} \tEr: {:.2} \tEr.w: {:.1} \tw: {:.1} \tKp: {:.3} \tKd: {:.3}",
            snapshot.command,
            snapshot.error,
            snapshot.error_deriv,
            snapshot.velocity,
            snapshot.p_term,
            snapshot.d_term
        );
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_every_nth() {
        let mut sampler = DebugSampler::new(3);
        let emitted: Vec<bool> = (0..7).map(|_| sampler.tick()).collect();
        assert_eq!(emitted, vec![false, false, true, false, false, true, false]);
    }

    #[test]
    fn test_zero_means_every_call() {
        let mut sampler = DebugSampler::new(0);
        assert!(sampler.tick());
        assert!(sampler.tick());
    }

    #[test]
    fn test_sample_returns_snapshot_when_due() {
        let mut sampler = DebugSampler::new(2);
        let snap = ControllerDebug {
            command: 0.5,
            ..ControllerDebug::default()
        };
        assert_eq!(sampler.sample(snap), None);
        assert_eq!(sampler.sample(snap), Some(snap));
    }
}
