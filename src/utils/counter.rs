//! Process wide named counters.
//!
//! Hot paths bump them through [counter!](crate::utils::counter::counter) and the
//! [timed_scope_accumulate!](crate::utils::timer::timed_scope_accumulate) macro; the totals are
//! logged by [report_counters] when the renderer shuts down.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

pub enum Counter {
    /// Number of events
    Events(AtomicU64),
    /// Accumulated duration, in nanoseconds. Overflows after about 584 years.
    Time(AtomicU64),
}

impl Counter {
    pub const fn events() -> Self {
        Counter::Events(AtomicU64::new(0))
    }

    pub const fn time() -> Self {
        Counter::Time(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        if let Counter::Events(n) = self {
            n.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_time(&self, elapsed: Duration) {
        if let Counter::Time(nanos) = self {
            nanos.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        }
    }

    pub fn format(&self) -> String {
        match self {
            Counter::Events(n) => n.load(Ordering::Acquire).to_string(),
            Counter::Time(nanos) => {
                super::timer::format_elapsed(Duration::from_nanos(nanos.load(Ordering::Acquire)))
            }
        }
    }
}

lazy_static::lazy_static! {
    static ref COUNTERS: Mutex<BTreeMap<&'static str, Arc<Counter>>> = Mutex::new(BTreeMap::new());
}

fn counters() -> MutexGuard<'static, BTreeMap<&'static str, Arc<Counter>>> {
    COUNTERS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The counter registered under `name`, created with `make` on first use
pub fn register_counter(name: &'static str, make: fn() -> Counter) -> Arc<Counter> {
    counters()
        .entry(name)
        .or_insert_with(|| Arc::new(make()))
        .clone()
}

/// Log every counter, sorted by name
pub fn report_counters() {
    for (name, counter) in counters().iter() {
        log::info!(target: "counter_report", "{name}: {}", counter.format());
    }
}

/// Value of an event counter, None if it was never bumped
pub fn counter_value(name: &str) -> Option<u64> {
    match counters().get(name).map(|c| &**c) {
        Some(Counter::Events(n)) => Some(n.load(Ordering::Acquire)),
        _ => None,
    }
}

/// Total of a time counter, None if nothing was timed under that name
pub fn counter_time(name: &str) -> Option<Duration> {
    match counters().get(name).map(|c| &**c) {
        Some(Counter::Time(nanos)) => Some(Duration::from_nanos(nanos.load(Ordering::Acquire))),
        _ => None,
    }
}

/// Count an event. Compiled out without the `counter` feature.
#[macro_export]
macro_rules! counter {
    ($name:literal) => {
        if cfg!(feature = "counter") {
            $crate::utils::counter::lazy_static::lazy_static! {
                static ref COUNTER: std::sync::Arc<$crate::utils::counter::Counter> =
                    $crate::utils::counter::register_counter($name, $crate::utils::counter::Counter::events);
            }
            COUNTER.inc();
        }
    };
}

pub use counter;
pub use lazy_static;
