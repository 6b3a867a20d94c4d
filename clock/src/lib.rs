//! Slot clocks.
//!
//! [`SystemSlotClock`] derives slots from the wall clock. [`ManualSlotClock`] is set explicitly.
//! [`slot_ticks`] produces a [`Stream`] of slots using [`Interval`].
//!
//! An [`Interval`] may produce items late, but the delays do not accumulate.
//! Consumers that need the exact current slot should query a [`SlotClock`] instead of counting
//! items.
//!
//! [`Interval`]: tokio::time::Interval

use core::{
    error::Error,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use std::time::{SystemTime, SystemTimeError};

use anyhow::Result;
use futures::stream::{Stream, StreamExt as _};
use thiserror::Error;
use tokio::time::Instant;
use tokio_stream::wrappers::IntervalStream;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Slot, UnixSeconds},
    },
};

pub trait SystemTimeLike: Copy {
    type Error: Error + Send + Sync + 'static;

    const UNIX_EPOCH: Self;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error>;
}

impl SystemTimeLike for SystemTime {
    type Error = SystemTimeError;

    const UNIX_EPOCH: Self = Self::UNIX_EPOCH;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error> {
        Self::duration_since(&self, earlier)
    }
}

/// Source of the current slot for gossip validation.
pub trait SlotClock: Send + Sync {
    fn current_slot(&self) -> Slot;

    /// The current slot as seen by a peer whose clock is ahead by the maximum allowed disparity.
    fn current_slot_with_gossip_disparity(&self) -> Slot;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemSlotClock {
    genesis_time: UnixSeconds,
    slot_duration: Duration,
    maximum_gossip_clock_disparity: Duration,
}

impl SystemSlotClock {
    #[must_use]
    pub const fn new(config: &Config, genesis_time: UnixSeconds) -> Self {
        Self {
            genesis_time,
            slot_duration: config.slot_duration(),
            maximum_gossip_clock_disparity: config.maximum_gossip_clock_disparity(),
        }
    }

    /// Slots before genesis are reported as [`GENESIS_SLOT`].
    pub fn slot_at<S: SystemTimeLike>(&self, now: S) -> Result<Slot> {
        let duration_since_unix_epoch = now.duration_since(S::UNIX_EPOCH)?;
        self.slot_at_duration(duration_since_unix_epoch)
    }

    pub fn slot_with_gossip_disparity_at<S: SystemTimeLike>(&self, now: S) -> Result<Slot> {
        let duration_since_unix_epoch = now
            .duration_since(S::UNIX_EPOCH)?
            .saturating_add(self.maximum_gossip_clock_disparity);

        self.slot_at_duration(duration_since_unix_epoch)
    }

    // `Duration` does not implement `Div<Duration>`, so we have to do arithmetic on nanoseconds.
    fn slot_at_duration(&self, duration_since_unix_epoch: Duration) -> Result<Slot> {
        let nanos_since_genesis = duration_since_unix_epoch
            .saturating_sub(Duration::from_secs(self.genesis_time))
            .as_nanos();

        let slots_since_genesis =
            u64::try_from(nanos_since_genesis / self.slot_duration.as_nanos())?;

        GENESIS_SLOT
            .checked_add(slots_since_genesis)
            .ok_or_else(|| ClockError::RanOutOfSlots.into())
    }

    fn duration_until_next_slot(&self, now: SystemTime) -> Result<Duration> {
        let duration_since_genesis = now
            .duration_since(SystemTime::UNIX_EPOCH)?
            .checked_sub(Duration::from_secs(self.genesis_time));

        let Some(duration_since_genesis) = duration_since_genesis else {
            return Ok(Duration::from_secs(self.genesis_time)
                .saturating_sub(now.duration_since(SystemTime::UNIX_EPOCH)?));
        };

        let nanos_into_slot = duration_since_genesis.as_nanos() % self.slot_duration.as_nanos();
        let nanos_into_slot = u64::try_from(nanos_into_slot)?;

        Ok(self.slot_duration.saturating_sub(Duration::from_nanos(nanos_into_slot)))
    }
}

impl SlotClock for SystemSlotClock {
    fn current_slot(&self) -> Slot {
        // The system clock being set before 1970 is treated as being before genesis.
        self.slot_at(SystemTime::now()).unwrap_or(GENESIS_SLOT)
    }

    fn current_slot_with_gossip_disparity(&self) -> Slot {
        self.slot_with_gossip_disparity_at(SystemTime::now())
            .unwrap_or(GENESIS_SLOT)
    }
}

/// A clock that only moves when told to.
#[derive(Default, Debug)]
pub struct ManualSlotClock {
    slot: AtomicU64,
    slot_with_gossip_disparity: AtomicU64,
}

impl ManualSlotClock {
    #[must_use]
    pub const fn new(slot: Slot) -> Self {
        Self {
            slot: AtomicU64::new(slot),
            slot_with_gossip_disparity: AtomicU64::new(slot),
        }
    }

    pub fn set_slot(&self, slot: Slot) {
        self.slot.store(slot, Ordering::SeqCst);
        self.slot_with_gossip_disparity.store(slot, Ordering::SeqCst);
    }

    /// Simulates being within the gossip disparity of the start of the next slot.
    pub fn set_near_next_slot(&self, slot: Slot) {
        self.slot.store(slot, Ordering::SeqCst);
        self.slot_with_gossip_disparity
            .store(slot.saturating_add(1), Ordering::SeqCst);
    }
}

impl SlotClock for ManualSlotClock {
    fn current_slot(&self) -> Slot {
        self.slot.load(Ordering::SeqCst)
    }

    fn current_slot_with_gossip_disparity(&self) -> Slot {
        self.slot_with_gossip_disparity.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("time of next slot overflowed")]
    NextInstantOverflow,
    #[error("ran out of slots")]
    RanOutOfSlots,
}

/// Yields every slot at its start, beginning with the next one.
///
/// Must be called from within a Tokio runtime.
pub fn slot_ticks(
    config: &Config,
    genesis_time: UnixSeconds,
) -> Result<impl Stream<Item = Result<Slot>>> {
    let clock = SystemSlotClock::new(config, genesis_time);

    // We assume the `Instant` and `SystemTime` obtained here correspond to the same point in time.
    let now_instant = Instant::now();
    let now_system_time = SystemTime::now();

    let until_next_slot = clock.duration_until_next_slot(now_system_time)?;
    let mut next_slot = clock.slot_at_duration(
        now_system_time
            .duration_since(SystemTime::UNIX_EPOCH)?
            .saturating_add(until_next_slot),
    )?;

    let next_instant = now_instant
        .checked_add(until_next_slot)
        .ok_or(ClockError::NextInstantOverflow)?;

    let interval = tokio::time::interval_at(next_instant, clock.slot_duration);

    Ok(IntervalStream::new(interval).map(move |_| {
        let slot = next_slot;
        next_slot = slot.checked_add(1).ok_or(ClockError::RanOutOfSlots)?;
        Ok(slot)
    }))
}
