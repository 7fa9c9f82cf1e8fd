//! Scoped timing helpers.

use std::{
    ops::{Deref, DerefMut},
    time::{Duration, Instant},
};

/// The value returned by a timed closure, with the time it took
pub struct TimedResult<T> {
    pub res: T,
    pub elapsed: Duration,
}

impl<T> TimedResult<T> {
    pub fn into_inner(self) -> T {
        self.res
    }
}

impl<T> Deref for TimedResult<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.res
    }
}

impl<T> DerefMut for TimedResult<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.res
    }
}

pub fn timed_scope<R, F: FnOnce() -> R>(f: F) -> TimedResult<R> {
    let begin = Instant::now();
    let res = f();
    TimedResult {
        res,
        elapsed: begin.elapsed(),
    }
}

/// Like [timed_scope], and logs the duration on the `scoped timer` target
pub fn timed_scope_log<R, F: FnOnce() -> R>(label: &str, f: F) -> TimedResult<R> {
    let timed = timed_scope(f);
    log::info!(target: "scoped timer", "{label}: {}", format_elapsed(timed.elapsed));
    timed
}

/// Human readable duration: `µs`, `ms` or `s` with three decimals, `XhYmZs` above a minute
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f32();
    if elapsed < Duration::from_millis(1) {
        format!("{:.3}µs", secs * 1e6)
    } else if elapsed < Duration::from_secs(1) {
        format!("{:.3}ms", secs * 1e3)
    } else if elapsed < Duration::from_secs(60) {
        format!("{secs:.3}s")
    } else {
        let total = elapsed.as_secs();
        format!("{}h{}m{}s", total / 3600, (total / 60) % 60, total % 60)
    }
}

/// Run `f` and add its duration to `timer`
pub fn timed_scope_accumulate_<R, F: FnOnce() -> R>(timer: &Counter, f: F) -> TimedResult<R> {
    let timed_res = timed_scope(f);
    timer.add_time(timed_res.elapsed);
    timed_res
}

/// Evaluate a closure, adding its duration to the named time counter when the
/// `counter_time` feature is enabled
#[macro_export]
macro_rules! timed_scope_accumulate {
    ($name:literal, $($arg: tt)+) => {
        if cfg!(feature = "counter_time") {
            $crate::utils::counter::lazy_static::lazy_static! {
                static ref TIMER: std::sync::Arc<$crate::utils::counter::Counter> =
                    $crate::utils::counter::register_counter($name, $crate::utils::counter::Counter::time);
            }
            $crate::utils::timer::timed_scope_accumulate_(&TIMER, $($arg)+).res
        } else {
            #[allow(clippy::redundant_closure_call)]
            ($($arg)+) ()
        }
    };
}

pub use timed_scope_accumulate;

use super::counter::Counter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format() {
        assert_eq!(format_elapsed(Duration::from_micros(500)), "500.000µs");
        assert_eq!(format_elapsed(Duration::from_millis(12)), "12.000ms");
        assert_eq!(format_elapsed(Duration::from_secs(2)), "2.000s");
        assert_eq!(format_elapsed(Duration::from_secs(3600 + 120 + 5)), "1h2m5s");
    }

    #[test]
    fn timed() {
        let r = timed_scope(|| 21 * 2);
        assert_eq!(*r, 42);
        let r: i32 = timed_scope_accumulate!("test timer", || 7);
        assert_eq!(r, 7);
    }
}
