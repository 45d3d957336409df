use crate::live::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::live::events::WireCandidate;

pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 1000;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LiveRules {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: String,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct LiveConfig {
    #[serde(rename = "contestName")]
    pub contest_name: Option<String>,
    #[serde(rename = "debounceMillis")]
    pub debounce_millis: Option<u64>,
    pub rules: Option<LiveRules>,
}

impl LiveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_millis.unwrap_or(DEFAULT_DEBOUNCE_MILLIS))
    }

    pub fn vote_rules(&self) -> LiveResult<VoteRules> {
        match &self.rules {
            Some(r) => validate_rules(r),
            None => Ok(VoteRules::DEFAULT_RULES),
        }
    }

    pub fn random_seed(&self) -> LiveResult<Option<u64>> {
        match self.rules.as_ref().and_then(|r| r.random_seed.clone()) {
            None => Ok(None),
            Some(s) => match s.parse::<u64>() {
                Ok(x) => Ok(Some(x)),
                Err(_) => whatever!("Failed to understand randomSeed option: {:?}", s),
            },
        }
    }
}

/// An election given in full, for counting offline.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionFile {
    pub candidates: Vec<WireCandidate>,
    pub ballots: Vec<Vec<u32>>,
}

pub fn validate_rules(live_rules: &LiveRules) -> LiveResult<VoteRules> {
    let tiebreak_mode = match live_rules.tiebreak_mode.as_str() {
        "random" => TieBreakMode::Random,
        "useCandidateOrder" => TieBreakMode::UseCandidateOrder,
        x => {
            whatever!(
                "Cannot use tiebreak mode {:?} (currently not implemented)",
                x
            )
        }
    };
    Ok(VoteRules { tiebreak_mode })
}

pub fn read_config(path: &str) -> LiveResult<LiveConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: LiveConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_election_json(path: &str) -> LiveResult<(Vec<Candidate>, Vec<Ballot>)> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let ef: ElectionFile = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let candidates: Vec<Candidate> = ef.candidates.into_iter().map(Candidate::from).collect();
    let ballots: Vec<Ballot> = ef.ballots.into_iter().map(Ballot::from).collect();
    Ok((candidates, ballots))
}

pub fn read_summary(path: &str) -> LiveResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let c = LiveConfig::default();
        assert_eq!(c.debounce(), Duration::from_millis(1000));
        assert_eq!(c.vote_rules().unwrap(), VoteRules::DEFAULT_RULES);
        assert_eq!(c.random_seed().unwrap(), None);
    }

    #[test]
    fn parses_rules() {
        let c: LiveConfig = serde_json::from_str(
            r#"{"debounceMillis": 250, "rules": {"tiebreakMode": "useCandidateOrder", "randomSeed": "42"}}"#,
        )
        .unwrap();
        assert_eq!(c.debounce(), Duration::from_millis(250));
        assert_eq!(
            c.vote_rules().unwrap().tiebreak_mode,
            TieBreakMode::UseCandidateOrder
        );
        assert_eq!(c.random_seed().unwrap(), Some(42));
    }

    #[test]
    fn rejects_unknown_rules() {
        let c: LiveConfig = serde_json::from_str(
            r#"{"rules": {"tiebreakMode": "previousRoundCounts", "randomSeed": "x"}}"#,
        )
        .unwrap();
        assert!(c.vote_rules().is_err());
        assert!(c.random_seed().is_err());
    }
}
