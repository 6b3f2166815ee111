use std::fmt::Arguments;

/// A minimal formatted-message sink for pool diagnostics.
///
/// The pool uses this to report task panics that no
/// [panic handler][crate::PoolBuilder::panic_handler] intercepts. Supply your
/// own implementation via [`PoolBuilder::logger()`][1] to route these reports
/// somewhere other than the default [`tracing`] events.
///
/// # Example
///
/// ```
/// use std::fmt::Arguments;
///
/// use task_pool::PoolLogger;
///
/// struct StderrLogger;
///
/// impl PoolLogger for StderrLogger {
///     fn log(&self, message: Arguments<'_>) {
///         eprintln!("{message}");
///     }
/// }
/// ```
///
/// [1]: crate::PoolBuilder::logger
pub trait PoolLogger: Send + Sync {
    /// Records one formatted diagnostic message.
    fn log(&self, message: Arguments<'_>);
}

/// The default diagnostic sink: every message becomes a `tracing` event at
/// error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl PoolLogger for TracingLogger {
    fn log(&self, message: Arguments<'_>) {
        tracing::error!("{message}");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Test sink that collects every message into a vector.
    pub(crate) struct CollectingLogger {
        messages: Mutex<Vec<String>>,
    }

    impl CollectingLogger {
        pub(crate) fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.messages.lock().unwrap())
        }
    }

    impl PoolLogger for CollectingLogger {
        fn log(&self, message: Arguments<'_>) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn collecting_logger_captures_formatted_message() {
        let logger = CollectingLogger::new();

        logger.log(format_args!("worker {}: task panicked", 7));

        assert_eq!(logger.take(), vec!["worker 7: task panicked".to_string()]);
    }
}
