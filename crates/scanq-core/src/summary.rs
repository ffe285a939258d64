//! Count and earnings aggregates over a set of normalized records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::records::{NormalizedRecord, PaymentRates, QualityStatus};
use crate::CoreError;

/// Partial-to-approved value ratio used when the approved rate is zero.
const FALLBACK_PARTIAL_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
    pub total: usize,
    pub approved_count: usize,
    pub partial_count: usize,
    pub reproved_count: usize,
    /// Records whose status matched no rule; they earn nothing but are
    /// never dropped from `total`.
    pub other_count: usize,
    /// Approved-scan equivalents, rounded to one decimal place.
    pub weighted_equivalent: Decimal,
    pub total_earnings: Decimal,
    pub rates: PaymentRates,
}

impl QualitySummary {
    /// Builds a summary from raw category counts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Overflow`] when the rates are so extreme that the
    /// ratio or the earnings fall outside the `Decimal` range.
    pub fn from_counts(
        approved_count: usize,
        partial_count: usize,
        reproved_count: usize,
        other_count: usize,
        rates: PaymentRates,
    ) -> Result<Self, CoreError> {
        let approved = Decimal::from(approved_count);
        let partial = Decimal::from(partial_count);

        let ratio = if rates.approved > Decimal::ZERO {
            rates
                .partial
                .checked_div(rates.approved)
                .ok_or(CoreError::Overflow("partial/approved rate ratio"))?
        } else {
            FALLBACK_PARTIAL_RATIO
        };
        let weighted_equivalent = partial
            .checked_mul(ratio)
            .and_then(|p| p.checked_add(approved))
            .ok_or(CoreError::Overflow("weighted equivalent"))?
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        let total_earnings = approved
            .checked_mul(rates.approved)
            .zip(partial.checked_mul(rates.partial))
            .and_then(|(a, p)| a.checked_add(p))
            .ok_or(CoreError::Overflow("total earnings"))?;

        Ok(Self {
            total: approved_count + partial_count + reproved_count + other_count,
            approved_count,
            partial_count,
            reproved_count,
            other_count,
            weighted_equivalent,
            total_earnings,
            rates,
        })
    }
}

/// Counts records per category and prices them at `rates`.
///
/// # Errors
///
/// See [`QualitySummary::from_counts`].
pub fn summarize<'a, I>(records: I, rates: PaymentRates) -> Result<QualitySummary, CoreError>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let (mut approved, mut partial, mut reproved, mut other) = (0, 0, 0, 0);
    for record in records {
        match record.quality_status() {
            QualityStatus::Approved => approved += 1,
            QualityStatus::PartiallyApproved => partial += 1,
            QualityStatus::Reproved => reproved += 1,
            QualityStatus::Other(_) => other += 1,
        }
    }
    QualitySummary::from_counts(approved, partial, reproved, other, rates)
}

/// Status counts for one calendar week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    pub week_start: NaiveDate,
    /// Keyed by status label: the canonical label for recognized statuses,
    /// the raw text otherwise.
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
}

impl WeekBucket {
    #[must_use]
    pub fn count(&self, status: &QualityStatus) -> usize {
        self.counts.get(status.as_str()).copied().unwrap_or(0)
    }
}

/// Groups records by week start, ascending.
#[must_use]
pub fn weekly_breakdown<'a, I>(records: I) -> Vec<WeekBucket>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut weeks: BTreeMap<NaiveDate, BTreeMap<String, usize>> = BTreeMap::new();
    for record in records {
        *weeks
            .entry(record.week_start())
            .or_default()
            .entry(record.quality_status().as_str().to_string())
            .or_default() += 1;
    }

    weeks
        .into_iter()
        .map(|(week_start, counts)| WeekBucket {
            week_start,
            total: counts.values().sum(),
            counts,
        })
        .collect()
}
