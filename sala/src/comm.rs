use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Progress and cancellation channel supplied by the caller of a long-running analysis.
pub trait Communicator {
    fn set_total_steps(&self, _steps: usize) {}
    fn set_current_step(&self, _step: usize) {}
    fn set_total_records(&self, _records: usize) {}
    fn set_current_record(&self, _record: usize) {}
    fn is_cancelled(&self) -> bool { false }
}

/// Shared flag plus progress counters. Clones observe the same state, so a
/// UI thread can hold one clone and cancel while analysis holds another.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
    total: Arc<AtomicUsize>,
    current: Arc<AtomicUsize>,
}

impl CancelFlag {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.cancelled.store(true, Ordering::Relaxed); }
    pub fn total_records(&self) -> usize { self.total.load(Ordering::Relaxed) }
    pub fn current_record(&self) -> usize { self.current.load(Ordering::Relaxed) }
}

impl Communicator for CancelFlag {
    fn set_total_records(&self, records: usize) { self.total.store(records, Ordering::Relaxed); }
    fn set_current_record(&self, record: usize) { self.current.store(record, Ordering::Relaxed); }
    fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Relaxed) }
}

/// Rate limiter for cancellation polls. The first poll fires once `interval`
/// has elapsed since construction.
pub(crate) struct PollTimer {
    last: Instant,
    interval: Duration,
}

impl PollTimer {
    pub(crate) fn new(interval: Duration) -> Self {
        PollTimer { last: Instant::now(), interval }
    }

    pub(crate) fn due(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Polls `comm` when the timer is due. Errs with `Cancelled` if the caller asked to stop.
pub(crate) fn check_cancel(comm: Option<&dyn Communicator>, timer: &mut PollTimer) -> crate::Result<()> {
    if let Some(c) = comm {
        if timer.due() && c.is_cancelled() {
            tracing::debug!("cancellation observed");
            return Err(crate::SalaError::Cancelled);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = CancelFlag::new();
        let b = a.clone();
        b.set_total_records(7);
        a.cancel();
        assert!(b.is_cancelled());
        assert_eq!(a.total_records(), 7);
    }

    #[test]
    fn zero_interval_polls_every_time() {
        let flag = CancelFlag::new();
        let mut t = PollTimer::new(Duration::ZERO);
        assert!(check_cancel(Some(&flag), &mut t).is_ok());
        flag.cancel();
        assert!(matches!(check_cancel(Some(&flag), &mut t), Err(crate::SalaError::Cancelled)));
        assert!(check_cancel(None, &mut t).is_ok());
    }
}
