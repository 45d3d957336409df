pub use crate::config::*;

use rand::Rng;

/// A builder for assembling an election from candidate names.
///
/// Candidates receive the ids `0, 1, 2, ...` in the order they are given.
///
/// ```
/// pub use instant_runoff::builder::Builder;
/// pub use instant_runoff::VoteRules;
/// # use instant_runoff::VotingErrors;
///
/// let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_vote_simple(&["Anna".to_string(), "Bob".to_string()])?;
/// builder.add_ballot(vec![1].into());
///
/// let res = builder.run(&mut rand::thread_rng())?;
/// assert_eq!(res.threshold, 2);
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: VoteRules,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Result<Builder, VotingErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    pub fn candidates(self, cands: &[String]) -> Result<Builder, VotingErrors> {
        if cands.is_empty() {
            return Err(VotingErrors::EmptyElection);
        }
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands
                .iter()
                .enumerate()
                .map(|(idx, name)| Candidate::new(idx as u32, name))
                .collect(),
            _ballots: Vec::new(),
        })
    }

    /// Registers candidates that already carry their ids.
    pub fn registered(self, cands: Vec<Candidate>) -> Result<Builder, VotingErrors> {
        if cands.is_empty() {
            return Err(VotingErrors::EmptyElection);
        }
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands,
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot given by candidate names, most preferred first.
    ///
    /// Empty names are skipped. Names that are not registered are rejected.
    pub fn add_vote_simple(&mut self, names: &[String]) -> Result<(), VotingErrors> {
        let mut choices: Vec<CandidateId> = Vec::new();
        for n in names.iter().filter(|n| !n.is_empty()) {
            let cand = self
                ._candidates
                .iter()
                .find(|c| c.name == *n)
                .ok_or_else(|| VotingErrors::UnknownCandidate(n.clone()))?;
            choices.push(cand.id);
        }
        self.add_ballot(Ballot { choices });
        Ok(())
    }

    pub fn add_ballot(&mut self, ballot: Ballot) {
        self._ballots.push(ballot);
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self._ballots
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<VotingResult, VotingErrors> {
        crate::run_instant_runoff(&self._candidates, &self._ballots, &self._rules, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn names_are_mapped_to_ids() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        builder
            .add_vote_simple(&["c".to_string(), "".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(builder.ballots(), &[Ballot::from(vec![2, 0])]);
        assert_eq!(
            builder.add_vote_simple(&["z".to_string()]),
            Err(VotingErrors::UnknownCandidate("z".to_string()))
        );
    }

    #[test]
    fn run_counts_the_ballots() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&["a".to_string(), "b".to_string()])
            .unwrap();
        builder.add_vote_simple(&["b".to_string()]).unwrap();
        let res = builder.run(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(res.winner.name, "b");
        assert!(!res.won_by_default);
    }

    #[test]
    fn registered_candidates_keep_their_ids() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .registered(vec![Candidate::new(10, "x"), Candidate::new(20, "y")])
            .unwrap();
        builder.add_ballot(vec![20, 10].into());
        let res = builder.run(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(res.winner, Candidate::new(20, "y"));
        assert_eq!(
            Builder::new(&VoteRules::DEFAULT_RULES)
                .unwrap()
                .registered(vec![])
                .err(),
            Some(VotingErrors::EmptyElection)
        );
    }
}
