//! Logging support for the instrumented client.
//!
//! `tracing::event!` takes its level as a const expression, but the level
//! a command logs at comes from the instance's runtime-reconfigurable
//! policy. `dyn_event!` bridges the two.

/// Emits a `tracing` event at a level chosen at runtime.
macro_rules! dyn_event {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            tracing::Level::TRACE => tracing::event!(tracing::Level::TRACE, $($arg)+),
            tracing::Level::DEBUG => tracing::event!(tracing::Level::DEBUG, $($arg)+),
            tracing::Level::INFO => tracing::event!(tracing::Level::INFO, $($arg)+),
            tracing::Level::WARN => tracing::event!(tracing::Level::WARN, $($arg)+),
            _ => tracing::event!(tracing::Level::ERROR, $($arg)+),
        }
    };
}

pub(crate) use dyn_event;
