//! Priority-first, least-connections worker selection.
//!
//! # Algorithm
//! 1. Drop excluded, retiring and saturated workers, and any whose breaker
//!    reports unavailable (this is where OPEN lazily becomes HALF_OPEN)
//! 2. Keep the group with the numerically lowest priority
//! 3. Within it, pick the fewest `active_tasks`, ties by ascending id

use std::cmp::Ordering;
use std::collections::HashSet;
use tokio::time::Instant;

use crate::load_balancer::registry::Registry;
use crate::load_balancer::worker::WorkerState;

fn rank(a: &WorkerState, b: &WorkerState) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| a.active_tasks().cmp(&b.active_tasks()))
        .then_with(|| a.id().cmp(b.id()))
}

/// Choose the next worker for a task, or `None` if nothing is eligible.
pub fn select<'a>(
    registry: &'a mut Registry,
    excluded: &HashSet<String>,
    now: Instant,
) -> Option<&'a mut WorkerState> {
    registry
        .workers_mut()
        .filter(|w| !excluded.contains(w.id()) && !w.is_retiring() && w.has_capacity())
        .filter_map(|w| if w.is_available(now) { Some(w) } else { None })
        .min_by(|a, b| rank(a, b))
}
