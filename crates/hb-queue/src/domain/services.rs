//! Domain services for the consultation queue.
//!
//! Wait-time arithmetic shared by the queue operations and the simulator.

use super::entities::{Priority, QueueConfig, QueueEntry};
use crate::ports::RandomSource;

/// Initial estimate for a newly added entry.
///
/// Formula: max(floor, active * consultation + jitter)
pub fn initial_wait_estimate(
    config: &QueueConfig,
    active_count: usize,
    random: &mut dyn RandomSource,
) -> u32 {
    let jitter = random.range_inclusive(0, config.initial_jitter_max);
    slots_to_minutes(config, active_count)
        .saturating_add(jitter)
        .max(config.initial_wait_floor)
}

/// Recomputed estimate for an entry with `ahead` occupied slots before it.
///
/// Formula: max(min_wait, ahead * consultation + jitter)
pub fn recalculated_wait(
    config: &QueueConfig,
    ahead: usize,
    random: &mut dyn RandomSource,
) -> u32 {
    let jitter = random.range_inclusive(0, config.recalc_jitter_max);
    slots_to_minutes(config, ahead)
        .saturating_add(jitter)
        .max(config.min_wait_minutes)
}

/// Minutes the simulator takes off a progressing entry this tick.
pub fn progress_step(config: &QueueConfig, random: &mut dyn RandomSource) -> u32 {
    random.range_inclusive(config.progress_min_minutes, config.progress_max_minutes)
}

fn slots_to_minutes(config: &QueueConfig, slots: usize) -> u32 {
    u32::try_from(slots)
        .unwrap_or(u32::MAX)
        .saturating_mul(config.consultation_minutes)
}

/// Rounded mean wait time; halves round up, an empty slice yields 0.
pub fn average_wait(entries: &[QueueEntry]) -> u32 {
    if entries.is_empty() {
        return 0;
    }
    let n = entries.len() as u64;
    let sum: u64 = entries.iter().map(|e| u64::from(e.wait_time)).sum();
    u32::try_from((sum * 2 + n) / (n * 2)).unwrap_or(u32::MAX)
}

/// Number of high-priority entries.
pub fn count_high_priority(entries: &[QueueEntry]) -> usize {
    entries
        .iter()
        .filter(|e| e.priority == Priority::High)
        .count()
}

/// Moves every high-priority entry ahead of the rest, keeping relative order
/// within both groups.
pub fn partition_high_priority(entries: &mut [QueueEntry]) {
    // sort_by_key is stable.
    entries.sort_by_key(|e| !e.is_high_priority());
}
