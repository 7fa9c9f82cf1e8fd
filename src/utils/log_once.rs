//! Logging macros that only fire the first time their call site is reached.
//!
//! Useful in the render loop, where a missing kernel or a bad scene would otherwise be
//! reported every frame.

/// Log a message at most once per call site
#[macro_export]
macro_rules! log_once {
    (target: $target:expr, $lvl:expr, $($arg:tt)+) => {{
        static ONCE: std::sync::Once = std::sync::Once::new();
        ONCE.call_once(|| log::log!(target: $target, $lvl, $($arg)+));
    }};
    ($lvl:expr, $($arg:tt)+) => ($crate::log_once!(target: module_path!(), $lvl, $($arg)+));
}

#[macro_export]
macro_rules! error_once {
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Error, $($arg)+));
}

#[macro_export]
macro_rules! warn_once {
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Warn, $($arg)+));
}

pub use error_once;
pub use log_once;
pub use warn_once;
