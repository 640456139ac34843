//! Try budget for rate-limited calls.
//!
//! Only `429 Too Many Requests` consumes the budget; every other failure ends
//! the call on the first attempt.

/// How many attempts a single call may make while being rate limited.
///
/// # Examples
///
/// ```
/// use openrobot_api::Tries;
///
/// // One initial attempt plus up to two retries after waiting.
/// let limited = Tries::Limited(3);
///
/// // Keep honoring Retry-After until the API lets the call through.
/// let forever = Tries::Unbounded;
/// # let _ = (limited, forever);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tries {
    /// At most this many attempts in total. Must be at least 1.
    Limited(u32),
    /// Retry for as long as the API keeps rate limiting.
    Unbounded,
}

impl Default for Tries {
    fn default() -> Self {
        Tries::Limited(5)
    }
}

/// Tracks the attempts made by one call.
#[derive(Debug, Clone)]
pub(crate) struct RetryBudget {
    tries: Tries,
    attempts: usize,
}

impl RetryBudget {
    pub(crate) fn new(tries: Tries) -> Self {
        Self { tries, attempts: 0 }
    }

    /// Records the start of an attempt and returns its 1-indexed number.
    pub(crate) fn begin_attempt(&mut self) -> usize {
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether another attempt may follow the current one.
    pub(crate) fn can_retry(&self) -> bool {
        match self.tries {
            Tries::Limited(max) => self.attempts < max as usize,
            Tries::Unbounded => true,
        }
    }
}
