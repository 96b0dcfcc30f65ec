//! Bounded busy-waiting on device state.
//!
//! Drivers that cannot sleep (interrupt context, console output before the
//! scheduler exists) poll status bits in a tight loop. A `PollBudget` caps the
//! number of polls so that wedged hardware turns into an error instead of a
//! hang.
//!
//! ```rust
//! # use serial_core::poll::PollBudget;
//! #
//! let mut ticks = 0;
//! let res = PollBudget::new(8).spin_until(|| {
//!     ticks += 1;
//!     ticks == 3
//! });
//! assert!(res.is_ok());
//!
//! assert!(PollBudget::new(8).spin_until(|| false).is_err());
//! ```

use core::num::NonZeroU32;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Condition not met after {0} polls")]
pub struct PollTimeout(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Maximum number of polls a busy-wait may perform.
pub struct PollBudget(Option<NonZeroU32>);

impl Default for PollBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PollBudget {
    pub const DEFAULT: Self = Self::new(1 << 17);
    /// Poll forever.
    pub const UNBOUNDED: Self = Self(None);

    #[must_use]
    #[inline]
    /// Creates a budget of `polls` polls. A budget of zero still polls once.
    pub const fn new(polls: u32) -> Self {
        match NonZeroU32::new(polls) {
            Some(polls) => Self(Some(polls)),
            None => Self(Some(NonZeroU32::MIN)),
        }
    }

    #[must_use]
    #[inline]
    pub const fn polls(self) -> Option<u32> {
        match self.0 {
            Some(polls) => Some(polls.get()),
            None => None,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_bounded(self) -> bool {
        self.0.is_some()
    }

    /// Polls `done` until it returns `true` or the budget is exhausted.
    pub fn spin_until<F: FnMut() -> bool>(self, mut done: F) -> Result<(), PollTimeout> {
        let Some(polls) = self.0 else {
            while !done() {
                core::hint::spin_loop();
            }
            return Ok(());
        };

        for _ in 0..polls.get() {
            if done() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(PollTimeout(polls.get()))
    }
}
