/*!
Instant-runoff (alternative vote) tabulation.

The entry point is [`run_instant_runoff`]. It takes a snapshot of the
candidates and ballots of an election, and returns the winner together with
statistics for every round. The inputs are only borrowed: a count never
modifies the ballots it reads, so it can run while new ballots are being
collected elsewhere.

```
use instant_runoff::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

let candidates = vec![Candidate::new(0, "Anna"), Candidate::new(1, "Bob")];
let ballots: Vec<Ballot> = vec![vec![0, 1].into(), vec![0].into(), vec![1, 0].into()];
let mut rng = StdRng::seed_from_u64(7);

let res = run_instant_runoff(&candidates, &ballots, &VoteRules::DEFAULT_RULES, &mut rng)?;
assert_eq!(res.winner.name, "Anna");
assert_eq!(res.threshold, 2);
# Ok::<(), VotingErrors>(())
```
*/
mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};
use rand::{seq::SliceRandom, Rng};

use std::collections::{BTreeMap, HashMap, HashSet};

pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

// The preferences of a ballot that have not been consumed yet.
type Remainder<'a> = &'a [CandidateId];

/// One pile of ballot remainders per continuing candidate.
///
/// Piles are kept in increasing candidate id order, which is the order in
/// which the counts are inspected.
struct Buckets<'a> {
    piles: BTreeMap<CandidateId, Vec<Remainder<'a>>>,
}

impl<'a> Buckets<'a> {
    fn new(candidates: &[Candidate]) -> Buckets<'a> {
        Buckets {
            piles: candidates.iter().map(|c| (c.id, Vec::new())).collect(),
        }
    }

    fn len(&self) -> usize {
        self.piles.len()
    }

    /// Places every ballot under its first preference.
    fn distribute(&mut self, ballots: &'a [Ballot]) {
        let mut dropped = 0;
        for b in ballots.iter() {
            match self.advance(&b.choices) {
                Some((cid, rest)) => self.push(cid, rest),
                None => dropped += 1,
            }
        }
        debug!(
            "distribute: {} ballots distributed, {} dropped",
            ballots.len() - dropped,
            dropped
        );
    }

    fn push(&mut self, cid: CandidateId, rest: Remainder<'a>) {
        if let Some(pile) = self.piles.get_mut(&cid) {
            pile.push(rest);
        }
    }

    // Pops preferences until one names a continuing candidate.
    fn advance(&self, choices: Remainder<'a>) -> Option<(CandidateId, Remainder<'a>)> {
        let idx = choices
            .iter()
            .position(|cid| self.piles.contains_key(cid))?;
        if idx > 0 {
            debug!(
                "advance: skipped {:?} (not continuing)",
                &choices[..idx]
            );
        }
        Some((choices[idx], &choices[idx + 1..]))
    }

    fn tally(&self) -> Vec<(CandidateId, u64)> {
        self.piles
            .iter()
            .map(|(cid, pile)| (*cid, pile.len() as u64))
            .collect()
    }

    /// Removes the pile of the candidate and hands its ballots over to the
    /// next continuing preference.
    ///
    /// Returns the transfers to every receiving candidate and the number of
    /// exhausted ballots.
    fn eliminate(&mut self, loser: CandidateId) -> (Vec<(CandidateId, u64)>, u64) {
        let pile = self.piles.remove(&loser).unwrap_or_default();
        let mut transfers: BTreeMap<CandidateId, u64> = BTreeMap::new();
        let mut exhausted: u64 = 0;
        for rem in pile {
            match self.advance(rem) {
                Some((cid, rest)) => {
                    *transfers.entry(cid).or_insert(0) += 1;
                    self.push(cid, rest);
                }
                None => exhausted += 1,
            }
        }
        (transfers.into_iter().collect(), exhausted)
    }

    fn sole_survivor(&self) -> Option<CandidateId> {
        if self.piles.len() == 1 {
            self.piles.keys().next().cloned()
        } else {
            None
        }
    }
}

/// The number of votes that guarantees a majority among all the ballots cast.
pub fn droop_quota(num_ballots: usize) -> u64 {
    (num_ballots as u64 / 2) + 1
}

/// Runs the instant-runoff algorithm over the given ballots.
///
/// Arguments:
/// * `candidates` the registered candidates, in registry order. Ids must be unique.
/// * `ballots` the ranked ballots. Preferences naming an unknown candidate are skipped.
/// * `rules` the rules that govern this count
/// * `rng` the source of randomness for the random tiebreak
///
/// The quota is computed once over all the ballots, including the ones that
/// are empty or become exhausted.
pub fn run_instant_runoff<R: Rng + ?Sized>(
    candidates: &[Candidate],
    ballots: &[Ballot],
    rules: &VoteRules,
    rng: &mut R,
) -> Result<VotingResult, VotingErrors> {
    info!(
        "run_instant_runoff: Processing {:?} ballots, {:?} candidates, rules: {:?}",
        ballots.len(),
        candidates.len(),
        rules
    );
    check_candidates(candidates)?;
    let candidates_by_id: HashMap<CandidateId, &Candidate> =
        candidates.iter().map(|c| (c.id, c)).collect();

    let threshold = droop_quota(ballots.len());
    debug!("run_instant_runoff: threshold: {:?}", threshold);

    let mut buckets = Buckets::new(candidates);
    buckets.distribute(ballots);

    let mut round_stats: Vec<RoundStats> = Vec::new();
    while buckets.len() > 1 {
        let round_id = (round_stats.len() + 1) as RoundId;
        let tally = buckets.tally();
        debug!("Round id: {:?} tally: {:?}", round_id, tally);

        // Only one candidate can hold more than half of the ballots.
        if let Some((cid, count)) = tally.iter().find(|(_, c)| *c >= threshold).cloned() {
            info!(
                "Round id: {:?}: {:?} reaches the threshold with {:?} votes",
                round_id, cid, count
            );
            round_stats.push(RoundStats {
                round: round_id,
                tally,
                elected: Some(cid),
                eliminated: None,
            });
            return Ok(VotingResult {
                winner: candidates_by_id[&cid].clone(),
                threshold,
                won_by_default: false,
                round_stats,
                candidates: candidates.to_vec(),
            });
        }

        let (loser, tiebreak) =
            find_eliminated_candidate(&tally, rules.tiebreak_mode, candidates, rng);
        let (transfers, exhausted) = buckets.eliminate(loser);
        debug!(
            "Round id: {:?}: eliminated {:?}, transfers: {:?}, exhausted: {:?}",
            round_id, loser, transfers, exhausted
        );
        round_stats.push(RoundStats {
            round: round_id,
            tally,
            elected: None,
            eliminated: Some(EliminationStats {
                candidate: loser,
                transfers,
                exhausted,
                tiebreak,
            }),
        });
    }

    let last = buckets.sole_survivor().ok_or(VotingErrors::EmptyElection)?;
    info!(
        "run_instant_runoff: {:?} is the only remaining candidate after {} rounds",
        last,
        round_stats.len()
    );
    Ok(VotingResult {
        winner: candidates_by_id[&last].clone(),
        threshold,
        won_by_default: true,
        round_stats,
        candidates: candidates.to_vec(),
    })
}

fn check_candidates(candidates: &[Candidate]) -> Result<(), VotingErrors> {
    if candidates.is_empty() {
        return Err(VotingErrors::EmptyElection);
    }
    let mut seen: HashSet<CandidateId> = HashSet::new();
    for c in candidates.iter() {
        if !seen.insert(c.id) {
            return Err(VotingErrors::DuplicateCandidate(c.id));
        }
    }
    Ok(())
}

// The tally must hold at least two candidates.
fn find_eliminated_candidate<R: Rng + ?Sized>(
    tally: &[(CandidateId, u64)],
    tiebreak: TieBreakMode,
    candidates: &[Candidate],
    rng: &mut R,
) -> (CandidateId, Option<TiebreakStats>) {
    let min_count = tally.iter().map(|(_, c)| *c).min().unwrap_or(0);
    let all_smallest: Vec<CandidateId> = tally
        .iter()
        .filter_map(|(cid, c)| if *c == min_count { Some(*cid) } else { None })
        .collect();
    debug!(
        "find_eliminated_candidate: all_smallest: {:?}",
        all_smallest
    );

    if all_smallest.len() == 1 {
        return (all_smallest[0], None);
    }

    let loser = match tiebreak {
        TieBreakMode::UseCandidateOrder => {
            let candidate_order: HashMap<CandidateId, usize> = candidates
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.id, idx))
                .collect();
            // For loser selection, the last candidate in the list goes first.
            *all_smallest
                .iter()
                .max_by_key(|cid| candidate_order.get(*cid))
                .unwrap_or(&all_smallest[0])
        }
        TieBreakMode::Random => {
            let mut shuffled = all_smallest.clone();
            shuffled.shuffle(rng);
            shuffled[0]
        }
    };
    debug!(
        "find_eliminated_candidate: tie among {:?} resolved by {}: {:?}",
        all_smallest, tiebreak, loser
    );
    (
        loser,
        Some(TiebreakStats {
            tied: all_smallest,
            mode: tiebreak,
        }),
    )
}

impl VotingResult {
    pub fn candidate(&self, cid: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == cid)
    }

    fn label(&self, cid: CandidateId) -> String {
        match self.candidate(cid) {
            Some(c) => format!("{} ({})", c.name, cid),
            None => format!("({})", cid),
        }
    }

    /// Human-readable description of the count, one line per event.
    pub fn trace_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Droop quota set at {}", self.threshold)];
        for rs in self.round_stats.iter() {
            let tally: Vec<String> = rs
                .tally
                .iter()
                .map(|(cid, count)| format!("{}: {}", self.label(*cid), count))
                .collect();
            lines.push(format!("Round {}: {}", rs.round, tally.join(", ")));
            if let Some(cid) = rs.elected {
                let count = rs
                    .tally
                    .iter()
                    .find(|(c, _)| *c == cid)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                lines.push(format!(
                    "Round {}: {} has a majority with {} votes",
                    rs.round,
                    self.label(cid),
                    count
                ));
            }
            if let Some(es) = &rs.eliminated {
                if let Some(tb) = &es.tiebreak {
                    let tied: Vec<String> = tb.tied.iter().map(|cid| self.label(*cid)).collect();
                    lines.push(format!(
                        "Round {}: tie for last place among {}, broken by {}",
                        rs.round,
                        tied.join(", "),
                        tb.mode
                    ));
                }
                let transfers: Vec<String> = es
                    .transfers
                    .iter()
                    .map(|(cid, count)| format!("{} +{}", self.label(*cid), count))
                    .collect();
                lines.push(format!(
                    "Round {}: {} eliminated, transfers: [{}], exhausted: {}",
                    rs.round,
                    self.label(es.candidate),
                    transfers.join(", "),
                    es.exhausted
                ));
            }
        }
        if self.won_by_default {
            lines.push(format!(
                "WINNER: {} is the only remaining candidate, wins by default",
                self.label(self.winner.id)
            ));
        } else {
            lines.push(format!("WINNER: {}", self.label(self.winner.id)));
        }
        lines
    }
}
