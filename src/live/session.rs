// The state of one running election.

use instant_runoff::{Ballot, Candidate, CandidateId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt::Display;

use crate::live::registry::SessionCode;

/// Opaque token identifying a voter. Only used to refuse a second vote.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Fingerprint(pub String);

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle on the organizer's public key. It is only interpreted by a
/// signature verifier.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct PublicKeyHandle(pub String);

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CreatorIdentity {
    pub fingerprint: Fingerprint,
    pub public_key: PublicKeyHandle,
}

/// An owned copy of everything a count needs.
#[derive(Debug, Clone)]
pub struct TallySnapshot {
    pub candidates: Vec<Candidate>,
    pub ballots: Vec<Ballot>,
    pub rng: StdRng,
}

#[derive(Debug)]
pub struct ElectionSession {
    code: SessionCode,
    candidates: Vec<Candidate>,
    ballots: Vec<Ballot>,
    // Storage order is meaningless: reshuffled after every insertion.
    voters: Vec<Fingerprint>,
    creator: CreatorIdentity,
    logging: bool,
    count_pending: bool,
    closed: bool,
    last_winner: Option<CandidateId>,
    rng: StdRng,
}

impl ElectionSession {
    pub fn new(
        code: SessionCode,
        candidates: Vec<Candidate>,
        creator: CreatorIdentity,
        logging: bool,
        rng: StdRng,
    ) -> ElectionSession {
        ElectionSession {
            code,
            candidates,
            ballots: Vec::new(),
            voters: Vec::new(),
            creator,
            logging,
            count_pending: false,
            closed: false,
            last_winner: None,
            rng,
        }
    }

    pub fn code(&self) -> SessionCode {
        self.code
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn voters(&self) -> &[Fingerprint] {
        &self.voters
    }

    pub fn creator(&self) -> &CreatorIdentity {
        &self.creator
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn has_voted(&self, fingerprint: &Fingerprint) -> bool {
        self.voters.contains(fingerprint)
    }

    /// Records the voter, then shuffles the whole ledger so that its order
    /// says nothing about the order of the ballots.
    ///
    /// Callers check `has_voted` first, under the same lock.
    pub fn register_voter(&mut self, fingerprint: Fingerprint) {
        self.voters.push(fingerprint);
        self.voters.shuffle(&mut self.rng);
    }

    pub fn cast_ballot(&mut self, ballot: Ballot) {
        self.ballots.push(ballot);
    }

    /// The candidates in a fresh random order, for display to a voter.
    pub fn shuffled_candidates(&mut self) -> Vec<Candidate> {
        let mut res = self.candidates.clone();
        res.shuffle(&mut self.rng);
        res
    }

    pub fn snapshot(&mut self) -> TallySnapshot {
        TallySnapshot {
            candidates: self.candidates.clone(),
            ballots: self.ballots.clone(),
            rng: StdRng::seed_from_u64(self.rng.gen()),
        }
    }

    /// Marks a count as scheduled. Returns false if one was already pending.
    pub fn begin_count(&mut self) -> bool {
        if self.count_pending {
            false
        } else {
            self.count_pending = true;
            true
        }
    }

    /// Clears the pending flag after a scheduled count over `counted` ballots.
    ///
    /// If ballots arrived while the count was running, the flag stays set and
    /// true is returned: the caller owes another count.
    pub fn finish_count(&mut self, counted: usize) -> bool {
        if self.ballots.len() > counted && !self.closed {
            true
        } else {
            self.count_pending = false;
            false
        }
    }

    pub fn count_pending(&self) -> bool {
        self.count_pending
    }

    /// Returns true if the winner differs from the last one broadcast.
    pub fn record_winner(&mut self, winner: CandidateId) -> bool {
        let changed = self.last_winner != Some(winner);
        self.last_winner = Some(winner);
        changed
    }

    pub fn last_winner(&self) -> Option<CandidateId> {
        self.last_winner
    }

    /// Stops accepting votes and joins.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
