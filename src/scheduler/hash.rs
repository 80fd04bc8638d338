//! Structural fingerprint of a timetable.
//!
//! Two timetables hash equal when they place the same (class, subject) at the
//! same cells, regardless of entry ids, teacher choice, or entry order.

use crate::models::TimetableEntry;

/// Polynomial rolling hash (base 31) over the sorted
/// `classId-subjectId-day-period` keys.
pub fn schedule_hash(entries: &[TimetableEntry]) -> u64 {
    schedule_hash_of_keys(&structure_keys(entries))
}

/// Sorted `classId-subjectId-day-period` keys.
pub fn structure_keys(entries: &[TimetableEntry]) -> Vec<String> {
    let mut keys: Vec<String> = entries
        .iter()
        .map(|e| format!("{}-{}-{}-{}", e.class_id, e.subject_id, e.day, e.period))
        .collect();
    keys.sort_unstable();
    keys
}

fn schedule_hash_of_keys(keys: &[String]) -> u64 {
    let mut h: u64 = 0;
    for key in keys {
        for b in key.bytes().chain(std::iter::once(b'|')) {
            h = h.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    h
}
