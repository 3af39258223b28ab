use std::time::Duration;

use tokio::time::Instant;

/// A single re-armable deadline.
///
/// Arming always replaces the previous deadline, so a timer never has more
/// than one outstanding fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub const fn disarmed() -> Self {
        Self { at: None }
    }

    /// Cancel-then-schedule. A zero period leaves the timer disarmed.
    pub fn arm(&mut self, now: Instant, period: Duration) {
        self.at = None;
        if !period.is_zero() {
            self.at = Some(now + period);
        }
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Disarms and reports true when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if at <= now => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of the armed deadlines.
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}
