mod challenger;
mod outcome;

pub use {challenger::AudioChallenger, outcome::ChallengeOutcome};
