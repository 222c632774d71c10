use std::sync::Mutex;

/// The legacy `ZeDMD_LogCallback` contract: a formatted message, handed to
/// whatever sink the integrator registered. `tracing` remains the primary,
/// structured channel (every call site also emits a `tracing` event); this
/// exists only to let callers that predate `tracing` keep working.
pub type LogCallback = Box<dyn Fn(&str) + Send>;

/// Holds at most one registered callback. Wrapped in a mutex rather than an
/// `AtomicPtr`-style trick since registration is rare (once at startup) and
/// never happens on a hot path.
#[derive(Default)]
pub(crate) struct LogSink {
    callback: Mutex<Option<LogCallback>>,
}

impl LogSink {
    pub(crate) fn set(&self, callback: Option<LogCallback>) {
        *self.callback.lock().unwrap() = callback;
    }

    /// Forwards `message` to the registered callback, if any. Call sites
    /// should also emit the equivalent `tracing` event themselves — this is
    /// an additional sink, not a replacement.
    pub(crate) fn forward(&self, message: &str) {
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(message);
        }
    }
}
