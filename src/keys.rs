use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Calendar month, normalized to its first day. A distinct type from
/// `DayKey` so a month-scoped surrogate ID can never be joined against a
/// day-scoped one by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        // day 1 exists in every month
        MonthKey(NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap())
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

/// Calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        DayKey(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

/// Dense 1-based surrogate IDs over the distinct keys of one dataset,
/// assigned in ascending sort order (chronological for period keys).
///
/// The ID space is local to a single cleaning run. Two cleaned outputs
/// may assign different IDs to the same calendar date when their
/// distinct-date sets differ, which is why the key types above are
/// tagged rather than bare integers.
#[derive(Debug, Clone)]
pub struct IdMap<K: Ord> {
    ids: BTreeMap<K, u32>,
}

impl<K: Ord + Copy> IdMap<K> {
    /// Deduplicates, sorts ascending, and ranks 1..=n. An empty input
    /// yields an empty map; downstream joins then produce zero rows,
    /// which is not an error.
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut ids: BTreeMap<K, u32> = keys.into_iter().map(|k| (k, 0)).collect();
        for (rank, id) in ids.values_mut().enumerate() {
            *id = rank as u32 + 1;
        }
        IdMap { ids }
    }

    pub fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keys in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u32)> {
        self.ids.iter().map(|(k, id)| (k, *id))
    }
}
