/// Tuning knobs for [`StreamEngine`](super::StreamEngine) transfers.
///
/// ```rust
/// use algostub::stream::StreamConfig;
///
/// let config = StreamConfig::new()
///     .poll_interval_ms(5)
///     .wait_timeout_ms(30_000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub(crate) poll_interval_ms: u32,
    pub(crate) max_stalls: u32,
    pub(crate) wait_timeout_ms: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            poll_interval_ms: 2,
            max_stalls: 2500,
            wait_timeout_ms: 10_000,
        }
    }
}

impl StreamConfig {
    /// Create a new config with the default settings.
    pub fn new() -> Self {
        StreamConfig::default()
    }

    /// Time to sleep whenever the ring buffer makes no progress. Defaults to
    /// 2ms.
    ///
    /// The exact value doesn't matter much, as long as it stays well below
    /// the time the algorithm takes to drain (or fill) the buffer.
    pub fn poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Number of consecutive sleeps without progress after which the
    /// transfer fails with [`Error::StreamTimeout`](crate::Error::StreamTimeout).
    /// Defaults to 2500.
    pub fn max_stalls(mut self, stalls: u32) -> Self {
        self.max_stalls = stalls;
        self
    }

    /// Time to wait for the algorithm to halt once the transfer loop is done.
    /// Defaults to 10s.
    pub fn wait_timeout_ms(mut self, ms: u32) -> Self {
        self.wait_timeout_ms = ms;
        self
    }
}
