/// Terminal and non-terminal states of one challenge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Challenge passed; the widget issued a verification token.
    Success {
        /// Token from `grecaptcha.getResponse()`.
        token: String,
    },
    /// The widget accepted the interaction but issued no token yet.
    Continue,
    /// The answer was rejected; the caller may retry with a new prompt.
    Retry,
    /// The prompt should be skipped and refreshed.
    Refresh,
    /// The challenge failed in a way that ends the session.
    Crash,
    /// The widget presented a challenge type this solver does not handle.
    Backcall,
}

impl ChallengeOutcome {
    /// Stable lowercase name for logs and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeOutcome::Success { .. } => "success",
            ChallengeOutcome::Continue => "continue",
            ChallengeOutcome::Retry => "retry",
            ChallengeOutcome::Refresh => "refresh",
            ChallengeOutcome::Crash => "crash",
            ChallengeOutcome::Backcall => "backcall",
        }
    }

    /// Whether this outcome carries a token.
    pub fn is_success(&self) -> bool {
        matches!(self, ChallengeOutcome::Success { .. })
    }
}
