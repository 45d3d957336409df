// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The identifier of a candidate. It must be unique within an election.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CandidateId(pub u32);

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

impl Candidate {
    pub fn new(id: u32, name: &str) -> Candidate {
        Candidate {
            id: CandidateId(id),
            name: name.to_string(),
        }
    }
}

/// A ranked ballot: the most preferred candidate comes first.
///
/// Ballots may be empty or only rank some of the candidates.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ballot {
    pub choices: Vec<CandidateId>,
}

impl Ballot {
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

impl From<Vec<u32>> for Ballot {
    fn from(ids: Vec<u32>) -> Self {
        Ballot {
            choices: ids.into_iter().map(CandidateId).collect(),
        }
    }
}

impl From<&[u32]> for Ballot {
    fn from(ids: &[u32]) -> Self {
        Ballot::from(ids.to_vec())
    }
}

// ******** Output data structures *********

/// How a tie for the lowest count was resolved.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TiebreakStats {
    /// All the candidates sharing the lowest count, in increasing id order.
    pub tied: Vec<CandidateId>,
    pub mode: TieBreakMode,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub candidate: CandidateId,
    /// Number of ballots moved to each continuing candidate.
    pub transfers: Vec<(CandidateId, u64)>,
    /// Number of ballots with no continuing candidate left.
    pub exhausted: u64,
    pub tiebreak: Option<TiebreakStats>,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Vec<(CandidateId, u64)>,
    pub elected: Option<CandidateId>,
    pub eliminated: Option<EliminationStats>,
}

impl RoundStats {
    /// Number of ballots still counting for a candidate in this round.
    pub fn active_ballots(&self) -> u64 {
        self.tally.iter().map(|(_, c)| c).sum()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VotingResult {
    pub winner: Candidate,
    /// The winning quota: floor(ballots / 2) + 1.
    pub threshold: u64,
    /// True if the winner was the last continuing candidate without reaching the quota.
    pub won_by_default: bool,
    pub round_stats: Vec<RoundStats>,
    /// The candidates of this count, in registry order.
    pub candidates: Vec<Candidate>,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    EmptyElection,
    DuplicateCandidate(CandidateId),
    UnknownCandidate(String),
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::EmptyElection => write!(f, "election has no candidates"),
            VotingErrors::DuplicateCandidate(cid) => {
                write!(f, "candidate id {} is registered more than once", cid)
            }
            VotingErrors::UnknownCandidate(name) => write!(f, "unknown candidate {:?}", name),
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Eliminate the tied candidate that comes last in the candidate list.
    UseCandidateOrder,
    /// Shuffle the tied candidates and eliminate the first one.
    Random,
}

impl Display for TieBreakMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieBreakMode::UseCandidateOrder => write!(f, "candidate order"),
            TieBreakMode::Random => write!(f, "random draw"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRules {
    pub tiebreak_mode: TieBreakMode,
}

impl VoteRules {
    pub const DEFAULT_RULES: VoteRules = VoteRules {
        tiebreak_mode: TieBreakMode::Random,
    };
}

impl Default for VoteRules {
    fn default() -> Self {
        VoteRules::DEFAULT_RULES
    }
}
