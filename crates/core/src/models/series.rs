use chrono::NaiveDate;

/// Nearest-prior-date lookup over a date-sorted slice.
///
/// Returns the entry with the largest key ≤ `date`, or `None` when the slice
/// is empty or `date` precedes every entry. Binary search, O(log n).
///
/// This is the single point-in-time query used by all three ledgers
/// (holdings, prices, cash), so "as of date D" means the same thing
/// everywhere in the crate.
pub fn latest_at_or_before<T>(
    entries: &[T],
    date: NaiveDate,
    key: impl Fn(&T) -> NaiveDate,
) -> Option<&T> {
    let idx = entries.partition_point(|e| key(e) <= date);
    if idx == 0 {
        None
    } else {
        Some(&entries[idx - 1])
    }
}
