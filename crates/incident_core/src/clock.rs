use std::cell::Cell;

use time::{Date, Duration, OffsetDateTime, UtcOffset};

/// Source of "now" and of the local UTC offset used for calendar-day logic.
pub trait Clock {
    fn now_utc(&self) -> OffsetDateTime;

    fn local_offset(&self) -> UtcOffset;

    fn now_local(&self) -> OffsetDateTime {
        self.now_utc().to_offset(self.local_offset())
    }

    fn today(&self) -> Date {
        self.now_local().date()
    }
}

/// Wall clock. The local offset is sampled once at construction; when the platform cannot
/// report it soundly the clock falls back to UTC.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new() -> Self {
        let offset = match UtcOffset::current_local_offset() {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!(error = %e, "local offset unavailable; using UTC");
                UtcOffset::UTC
            }
        };
        Self { offset }
    }

}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn local_offset(&self) -> UtcOffset {
        self.offset
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<OffsetDateTime>,
    offset: UtcOffset,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Cell::new(now),
            offset: UtcOffset::UTC,
        }
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        self.now.get()
    }

    fn local_offset(&self) -> UtcOffset {
        self.offset
    }
}
