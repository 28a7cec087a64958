use crate::ChallengeOutcome;

/// WHAT: Outcome names are stable lowercase identifiers
/// WHY: They end up in API payloads and log lines
#[test]
fn given_outcomes_when_naming_then_stable_strings() {
    let success = ChallengeOutcome::Success {
        token: "t".to_string(),
    };
    assert_eq!(success.as_str(), "success");
    assert_eq!(ChallengeOutcome::Continue.as_str(), "continue");
    assert_eq!(ChallengeOutcome::Retry.as_str(), "retry");
    assert_eq!(ChallengeOutcome::Refresh.as_str(), "refresh");
    assert_eq!(ChallengeOutcome::Crash.as_str(), "crash");
    assert_eq!(ChallengeOutcome::Backcall.as_str(), "backcall");
}

/// WHAT: Only Success counts as a pass
/// WHY: Continue must not be reported as a solved challenge
#[test]
fn given_outcomes_when_checking_success_then_only_token_variant_passes() {
    let success = ChallengeOutcome::Success {
        token: "t".to_string(),
    };
    assert!(success.is_success());
    assert!(!ChallengeOutcome::Continue.is_success());
    assert!(!ChallengeOutcome::Retry.is_success());
}
