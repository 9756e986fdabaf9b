//! Time-phased rate schedule.
//!
//! A [`PhaseTable`] is a step function over seconds elapsed since the sale
//! opened. [`RateSchedule`] holds one rate table per token plus an optional
//! minimum-contribution table, and turns `(paid, now)` into a [`Quote`].
//!
//! Canonical Bither schedule (13 days, rates in tokens per ether):
//!
//! | window          | BTR | BSK |
//! |-----------------|-----|-----|
//! | 0 – 2 hours     | 110 | 70  |
//! | 2 hours – day 1 | 110 | 68  |
//! | day 1 – day 5   | 109 | 66  |
//! | day 5 – day 9   | 108 | 64  |
//! | day 9 – day 13  | 107 | 62  |

use bither_core::constants::{SALE_DURATION_SECS, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use bither_core::error::{SaleError, ScheduleError};
use bither_core::types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// One step of a [`PhaseTable`]: `value` applies from `start_offset`
/// (inclusive) until the next step's offset (exclusive).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step<T> {
    pub start_offset: u64,
    pub value: T,
}

impl<T> Step<T> {
    pub fn new(start_offset: u64, value: T) -> Self {
        Self { start_offset, value }
    }
}

/// Ordered, contiguous step function over elapsed seconds.
///
/// Invariants (checked by [`PhaseTable::new`] and [`PhaseTable::validate`]):
/// non-empty, first step at offset 0, strictly ascending offsets, every
/// offset inside the sale duration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct PhaseTable<T> {
    steps: Vec<Step<T>>,
}

impl<T: Copy> PhaseTable<T> {
    pub fn new(steps: Vec<Step<T>>, duration: u64) -> Result<Self, ScheduleError> {
        let table = Self { steps };
        table.validate(duration)?;
        Ok(table)
    }

    /// Build from `(offset, value)` pairs.
    pub fn from_pairs(pairs: &[(u64, T)], duration: u64) -> Result<Self, ScheduleError> {
        Self::new(pairs.iter().map(|&(o, v)| Step::new(o, v)).collect(), duration)
    }

    pub fn validate(&self, duration: u64) -> Result<(), ScheduleError> {
        let first = self.steps.first().ok_or(ScheduleError::EmptyTable)?;
        if first.start_offset != 0 {
            return Err(ScheduleError::FirstOffsetNotZero(first.start_offset));
        }
        for (index, pair) in self.steps.windows(2).enumerate() {
            if pair[1].start_offset <= pair[0].start_offset {
                return Err(ScheduleError::UnorderedOffsets(index + 1));
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.start_offset >= duration {
                return Err(ScheduleError::OffsetBeyondDuration {
                    index,
                    offset: step.start_offset,
                    duration,
                });
            }
        }
        Ok(())
    }

    /// Phase index and value active at `elapsed` seconds after opening.
    ///
    /// Boundaries are right-exclusive: at exactly a step's offset, that
    /// step is already active.
    pub fn lookup(&self, elapsed: u64) -> (usize, T) {
        let index = self
            .steps
            .partition_point(|step| step.start_offset <= elapsed)
            .saturating_sub(1);
        (index, self.steps[index].value)
    }

    pub fn steps(&self) -> &[Step<T>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Rate table for one token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenRates {
    /// Token contract address.
    pub token: Address,
    /// Token units (minor) credited per wei contributed.
    pub rates: PhaseTable<Amount>,
}

/// Where a timestamp falls relative to the sale window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaleStatus {
    NotStarted,
    Active,
    Closed,
}

/// Tokens credited for one token type by a quote.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub token: Address,
    pub phase: usize,
    pub rate: Amount,
    pub amount: Amount,
}

/// Result of pricing a contribution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub paid: Amount,
    pub timestamp: Timestamp,
    pub allocations: Vec<Allocation>,
}

impl Quote {
    /// Amount allocated for `token`, zero if the token is not part of the quote.
    pub fn amount_of(&self, token: &Address) -> Amount {
        self.allocations
            .iter()
            .find(|a| &a.token == token)
            .map(|a| a.amount)
            .unwrap_or(0)
    }

    /// Rate applied for `token`.
    pub fn rate_of(&self, token: &Address) -> Option<Amount> {
        self.allocations.iter().find(|a| &a.token == token).map(|a| a.rate)
    }
}

/// Immutable pricing configuration of a sale.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RateSchedule {
    opening_time: Timestamp,
    duration: u64,
    tokens: Vec<TokenRates>,
    minimums: Option<PhaseTable<Amount>>,
}

impl RateSchedule {
    pub fn new(
        opening_time: Timestamp,
        duration: u64,
        tokens: Vec<TokenRates>,
    ) -> Result<Self, ScheduleError> {
        let schedule = Self { opening_time, duration, tokens, minimums: None };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Require a minimum contribution per phase (e.g. a private-sale window).
    pub fn with_minimums(mut self, minimums: PhaseTable<Amount>) -> Result<Self, ScheduleError> {
        minimums.validate(self.duration)?;
        self.minimums = Some(minimums);
        Ok(self)
    }

    /// The canonical 13-day Bither schedule for the BTR and BSK tokens.
    pub fn bither(opening_time: Timestamp, btr: Address, bsk: Address) -> Result<Self, ScheduleError> {
        Self::new(
            opening_time,
            SALE_DURATION_SECS,
            vec![
                TokenRates { token: btr, rates: btr_rates()? },
                TokenRates { token: bsk, rates: bsk_rates()? },
            ],
        )
    }

    /// Re-check every invariant. Called after deserializing a snapshot.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.duration == 0 {
            return Err(ScheduleError::ZeroDuration);
        }
        if self.tokens.is_empty() {
            return Err(ScheduleError::NoTokens);
        }
        for (i, entry) in self.tokens.iter().enumerate() {
            if self.tokens[..i].iter().any(|other| other.token == entry.token) {
                return Err(ScheduleError::DuplicateToken(entry.token));
            }
            entry.rates.validate(self.duration)?;
        }
        if let Some(minimums) = &self.minimums {
            minimums.validate(self.duration)?;
        }
        Ok(())
    }

    pub fn opening_time(&self) -> Timestamp {
        self.opening_time
    }

    /// First instant at which purchases are no longer accepted.
    pub fn closing_time(&self) -> Timestamp {
        self.opening_time.saturating_add(self.duration)
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn tokens(&self) -> &[TokenRates] {
        &self.tokens
    }

    pub fn status(&self, now: Timestamp) -> SaleStatus {
        if now < self.opening_time {
            SaleStatus::NotStarted
        } else if now < self.closing_time() {
            SaleStatus::Active
        } else {
            SaleStatus::Closed
        }
    }

    fn elapsed(&self, now: Timestamp) -> Result<u64, SaleError> {
        match self.status(now) {
            SaleStatus::Active => Ok(now - self.opening_time),
            _ => Err(SaleError::OutOfWindow {
                now,
                opening: self.opening_time,
                closing: self.closing_time(),
            }),
        }
    }

    /// Minimum contribution in force at `now`; zero when no minimum applies.
    pub fn minimum_contribution(&self, now: Timestamp) -> Result<Amount, SaleError> {
        let elapsed = self.elapsed(now)?;
        Ok(self.minimums.as_ref().map(|m| m.lookup(elapsed).1).unwrap_or(0))
    }

    /// Price `paid` wei at `now`.
    pub fn quote(&self, paid: Amount, now: Timestamp) -> Result<Quote, SaleError> {
        if paid == 0 {
            return Err(SaleError::ZeroContribution);
        }
        let elapsed = self.elapsed(now)?;
        let allocations = self
            .tokens
            .iter()
            .map(|entry| {
                let (phase, rate) = entry.rates.lookup(elapsed);
                let amount = paid.checked_mul(rate).ok_or(SaleError::ArithmeticOverflow)?;
                Ok(Allocation { token: entry.token, phase, rate, amount })
            })
            .collect::<Result<Vec<_>, SaleError>>()?;
        Ok(Quote { paid, timestamp: now, allocations })
    }
}

/// BTR rates: 110 on day 0, then 109, 108, 107 over four-day phases.
pub fn btr_rates() -> Result<PhaseTable<Amount>, ScheduleError> {
    PhaseTable::from_pairs(
        &[
            (0, 110),
            (SECONDS_PER_DAY, 109),
            (5 * SECONDS_PER_DAY, 108),
            (9 * SECONDS_PER_DAY, 107),
        ],
        SALE_DURATION_SECS,
    )
}

/// BSK rates: 70 for the first two hours, 68 for the rest of day 0, then
/// 66, 64, 62 over four-day phases.
pub fn bsk_rates() -> Result<PhaseTable<Amount>, ScheduleError> {
    PhaseTable::from_pairs(
        &[
            (0, 70),
            (2 * SECONDS_PER_HOUR, 68),
            (SECONDS_PER_DAY, 66),
            (5 * SECONDS_PER_DAY, 64),
            (9 * SECONDS_PER_DAY, 62),
        ],
        SALE_DURATION_SECS,
    )
}
