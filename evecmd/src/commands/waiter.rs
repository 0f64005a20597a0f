//! Policies for waiting on the coprocessor.
//!
//! [`Coprocessor`](super::Coprocessor) has to wait whenever the command FIFO
//! is too full for the next command, whenever a caller needs the FIFO to
//! drain, and whenever an asynchronous burst transfer is still holding the
//! bus. In each case it polls, and between polls it asks a
//! [`Waiter`](Waiter) what to do next.
//!
//! [`PollingWaiter`](PollingWaiter) is the default, which busy-polls forever
//! and so relies on the coprocessor eventually making progress.
//! [`BoundedWaiter`](BoundedWaiter) gives up after a fixed number of polls,
//! turning a stuck or miswired device into [`Error::Timeout`](crate::Error::Timeout).
//!
//! If you are working with this library on a platform where you are able to
//! listen for and respond to interrupt signals from the EVE chip then you
//! could improve power consumption by implementing a new `Waiter` which
//! puts the host processor to sleep inside `next_poll`.

/// What to do before the next poll.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backoff {
    Immediately,
    AfterMs(u32),
    GiveUp,
}

/// Decides how to back off between two polls of the coprocessor.
///
/// `attempt` counts the polls that have already come back unsatisfied in
/// the current wait, starting at one.
pub trait Waiter {
    fn next_poll(&mut self, attempt: u32) -> Backoff;
}

/// The default [`Waiter`](Waiter) implementation, which polls in a busy loop
/// with no limit.
#[derive(Clone, Copy, Default, Debug)]
pub struct PollingWaiter;

impl Waiter for PollingWaiter {
    fn next_poll(&mut self, _attempt: u32) -> Backoff {
        Backoff::Immediately
    }
}

/// A [`Waiter`](Waiter) that sleeps `delay_ms` between polls and gives up
/// after `polls` unsatisfied polls.
#[derive(Clone, Copy, Debug)]
pub struct BoundedWaiter {
    pub polls: u32,
    pub delay_ms: u32,
}

impl BoundedWaiter {
    pub const fn new(polls: u32, delay_ms: u32) -> Self {
        Self { polls, delay_ms }
    }
}

impl Waiter for BoundedWaiter {
    fn next_poll(&mut self, attempt: u32) -> Backoff {
        if attempt >= self.polls {
            Backoff::GiveUp
        } else if self.delay_ms == 0 {
            Backoff::Immediately
        } else {
            Backoff::AfterMs(self.delay_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded() {
        let mut w = BoundedWaiter::new(3, 2);
        assert_eq!(w.next_poll(1), Backoff::AfterMs(2));
        assert_eq!(w.next_poll(2), Backoff::AfterMs(2));
        assert_eq!(w.next_poll(3), Backoff::GiveUp);

        let mut w = BoundedWaiter::new(1, 0);
        assert_eq!(w.next_poll(1), Backoff::GiveUp);
        assert_eq!(BoundedWaiter::new(2, 0).next_poll(1), Backoff::Immediately);
    }

    #[test]
    fn test_polling_never_gives_up() {
        assert_eq!(PollingWaiter.next_poll(u32::MAX), Backoff::Immediately);
    }
}
