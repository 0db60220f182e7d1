//! Date-range partitioning
//!
//! Remote market-data APIs cap the volume of minute and tick data returned
//! per call. Splitting such requests into one sub-range per calendar day
//! bounds response size predictably regardless of symbol liquidity, while
//! coarser granularities stay within limits without splitting.

use chrono::{Duration, NaiveTime};

use crate::{DateRange, Frequency, TimeUnit};

/// End-of-day wall-clock time: 23:59:59.999999.
const END_OF_DAY_MICROS: u32 = 999_999;

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_micro_opt(23, 59, 59, END_OF_DAY_MICROS).expect("valid time")
}

/// Whether requests at this frequency must be split into daily sub-ranges.
///
/// Tick-level data (no frequency) always splits. Minute granularity and
/// finer splits; hour and coarser is served whole by the provider.
pub fn splits_daily(frequency: Option<&Frequency>) -> bool {
    match frequency {
        None => true,
        Some(freq) => freq.unit <= TimeUnit::Minute,
    }
}

/// The full-day envelope for one calendar day:
/// `00:00:00.000000`..`23:59:59.999999`.
pub fn day_envelope(date: chrono::NaiveDate) -> DateRange {
    DateRange {
        start: date.and_time(NaiveTime::MIN),
        end: date.and_time(end_of_day()),
    }
}

/// Whether a range starts at midnight and ends at 23:59:59.999999, i.e. is
/// a full-day envelope (possibly spanning multiple days). Envelope ranges
/// render date-only in artifact keys and file names; anything else keeps
/// its wall-clock times so distinct identities stay distinguishable.
pub fn is_day_envelope(range: &DateRange) -> bool {
    range.start.time() == NaiveTime::MIN && range.end.time() == end_of_day()
}

/// Split a requested date range into provider-sized sub-ranges.
///
/// Split-eligible requests (see [`splits_daily`]) yield one sub-range per
/// calendar day touched by `[range.start, range.end]`, each spanning the
/// full day envelope `00:00:00.000000`..`23:59:59.999999`. The first and
/// last day deliberately emit the full envelope rather than the clipped
/// wall-clock times: the provider returns everything on a day touched by
/// the query, and stable envelopes keep artifact identities reproducible
/// across runs.
///
/// Coarser frequencies return the original range unchanged as a singleton.
///
/// Output is chronological, ascending by start. Pure and deterministic.
pub fn split_date_range(range: DateRange, frequency: Option<&Frequency>) -> Vec<DateRange> {
    if !splits_daily(frequency) {
        return vec![range];
    }

    let mut ranges = Vec::with_capacity(range.day_span() as usize);
    let mut day = range.start.date();
    let last_day = range.end.date();

    while day <= last_day {
        ranges.push(day_envelope(day));
        day += Duration::days(1);
    }

    ranges
}
