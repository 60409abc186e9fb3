//! Online/offline hysteresis for the radiation monitor
//!
//! ```text
//! success:                      failures = 0, Offline → Online immediately
//! failure, failures + 1 <  N  → Unchanged (debounce)
//! failure, failures + 1 == N  → WentOffline (blank the snapshot once)
//! failure, failures + 1 >  N  → Unchanged (already announced)
//! ```
//!
//! Recovery is immediate while going offline is debounced, so a single
//! dropped request never flips the published status. The transition is
//! reported once; [`AvailabilityState::offline_confirmed`] stays true for
//! the whole failure run so the offline output can be republished.

use tracing::{debug, info, trace, warn};

use crate::Status;

/// Outcome of feeding one cycle result into the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing downstream needs to change
    Unchanged,

    /// The device answered after being offline
    WentOnline,

    /// The failure counter just reached the threshold
    WentOffline,
}

#[derive(Debug, Clone)]
pub struct AvailabilityState {
    status: Status,
    consecutive_failures: usize,
    threshold: usize,
    reset_requested: bool,
}

impl AvailabilityState {
    /// Start offline with no recorded failures
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        Self {
            status: Status::Offline,
            consecutive_failures: 0,
            threshold: threshold.max(1),
            reset_requested: false,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Offline with the failure counter at or past the threshold
    pub fn offline_confirmed(&self) -> bool {
        self.status == Status::Offline && self.consecutive_failures >= self.threshold
    }

    pub fn record(&mut self, success: bool) -> Transition {
        if success {
            self.record_success()
        } else {
            self.record_failure()
        }
    }

    pub fn record_success(&mut self) -> Transition {
        self.consecutive_failures = 0;
        trace!("radiation update successful");

        if self.status == Status::Offline {
            self.status = Status::Online;
            info!("radiation monitor online");
            return Transition::WentOnline;
        }

        Transition::Unchanged
    }

    pub fn record_failure(&mut self) -> Transition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        debug!(
            "radiation update failed ({}/{})",
            self.consecutive_failures, self.threshold
        );

        if self.consecutive_failures != self.threshold {
            return Transition::Unchanged;
        }

        if self.status == Status::Online {
            info!("radiation monitor offline");
        }
        self.status = Status::Offline;
        Transition::WentOffline
    }

    /// Ask for the device reset endpoint on the next fetch
    pub fn request_device_reset(&mut self) {
        if !self.reset_requested {
            warn!("rebooting radiation monitor");
        }
        self.reset_requested = true;
    }

    /// Consume a pending reset request
    pub fn take_reset_request(&mut self) -> bool {
        std::mem::take(&mut self.reset_requested)
    }
}
