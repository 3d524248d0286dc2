use core::time::Duration;

/// Default name of the execution context thread.
pub const DEFAULT_THREAD_NAME: &str = "imgloader-context";

/// Settings for the serialized execution context.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Name given to the context thread. Shows up in logs and debuggers.
    pub thread_name: String,

    /// How long shutdown waits for in-flight requests to settle before the
    /// context stops. Requests still running are then rejected.
    pub shutdown_timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}
