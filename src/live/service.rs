// The operations offered to the transport, and the debounced counting.

use instant_runoff::{run_instant_runoff, Ballot, Candidate, CandidateId, VoteRules, VotingResult};
use log::{debug, info, warn};
use parking_lot::Mutex;
use snafu::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::live::config_reader::{LiveConfig, DEFAULT_DEBOUNCE_MILLIS};
use crate::live::events::OutboundEvent;
use crate::live::registry::{SessionCode, SessionHandle, SessionRegistry};
use crate::live::session::{CreatorIdentity, Fingerprint, PublicKeyHandle, TallySnapshot};
use crate::live::*;

/// Fan-out of outbound events to the participants of an election.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, code: SessionCode, event: OutboundEvent);
}

/// Checks the organizer's signature before an election is closed.
///
/// Returns Ok(false) for a well-formed signature that does not match, and an
/// error message when the key or the signature cannot be interpreted.
pub trait SignatureVerifier: Send + Sync + 'static {
    fn verify(
        &self,
        public_key: &PublicKeyHandle,
        message: &[u8],
        signature: &str,
    ) -> Result<bool, String>;
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Delay between the first ballot of a window and the count.
    pub debounce: Duration,
    pub rules: VoteRules,
    /// Seed for session codes, voter shuffles and tiebreaks.
    pub seed: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MILLIS),
            rules: VoteRules::DEFAULT_RULES,
            seed: None,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &LiveConfig) -> LiveResult<ServiceSettings> {
        Ok(ServiceSettings {
            debounce: config.debounce(),
            rules: config.vote_rules()?,
            seed: config.random_seed()?,
        })
    }
}

struct Inner {
    registry: Mutex<SessionRegistry>,
    settings: ServiceSettings,
    sink: Arc<dyn EventSink>,
    verifier: Arc<dyn SignatureVerifier>,
}

/// Handle on the running elections. Clones share the same elections.
///
/// Casting a vote schedules a count on the ambient tokio runtime, so
/// `cast_vote` must be called from within one.
#[derive(Clone)]
pub struct ElectionService {
    inner: Arc<Inner>,
}

impl ElectionService {
    pub fn new(
        settings: ServiceSettings,
        sink: Arc<dyn EventSink>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> ElectionService {
        let registry = SessionRegistry::from_seed(settings.seed);
        ElectionService {
            inner: Arc::new(Inner {
                registry: Mutex::new(registry),
                settings,
                sink,
                verifier,
            }),
        }
    }

    pub fn create_election(
        &self,
        candidates: Vec<Candidate>,
        creator: CreatorIdentity,
        logging: bool,
    ) -> LiveResult<SessionCode> {
        ensure!(
            !candidates.is_empty(),
            InvalidCandidatesSnafu {
                reason: "no candidates"
            }
        );
        let mut seen: HashSet<CandidateId> = HashSet::new();
        for c in candidates.iter() {
            ensure!(
                seen.insert(c.id),
                InvalidCandidatesSnafu {
                    reason: format!("candidate id {} is used more than once", c.id)
                }
            );
        }
        let code = self
            .inner
            .registry
            .lock()
            .create_session(candidates, creator, logging);
        Ok(code)
    }

    /// Lets a voter join. Returns the candidates in a random order.
    pub fn check_code(
        &self,
        code: SessionCode,
        fingerprint: &Fingerprint,
    ) -> LiveResult<Vec<Candidate>> {
        let handle = self.session(code)?;
        let mut s = handle.lock();
        ensure!(!s.is_closed(), UnknownCodeSnafu { code });
        if s.has_voted(fingerprint) {
            warn!("[VOTER] {} already voted in election {}", fingerprint, code);
            return DuplicateVoterSnafu {
                code,
                fingerprint: fingerprint.0.clone(),
            }
            .fail();
        }
        debug!("[VOTER] {} joins election {}", fingerprint, code);
        Ok(s.shuffled_candidates())
    }

    pub fn cast_vote(
        &self,
        code: SessionCode,
        fingerprint: Fingerprint,
        ballot: Ballot,
    ) -> LiveResult<()> {
        let handle = self.session(code)?;
        let schedule = {
            let mut s = handle.lock();
            ensure!(!s.is_closed(), UnknownCodeSnafu { code });
            if s.has_voted(&fingerprint) {
                warn!("[VOTER] {} tried to vote twice in election {}", fingerprint, code);
                return DuplicateVoterSnafu {
                    code,
                    fingerprint: fingerprint.0,
                }
                .fail();
            }
            if let Err(reason) = check_ballot(s.candidates(), &ballot) {
                warn!("[VOTER] rejected ballot in election {}: {}", code, reason);
                return MalformedBallotSnafu { code, reason }.fail();
            }
            s.register_voter(fingerprint);
            s.cast_ballot(ballot);
            info!(
                "[VOTER] ballot received in election {} ({} ballots)",
                code,
                s.ballots().len()
            );
            s.begin_count()
        };
        if schedule {
            self.schedule_count(code, handle);
        }
        Ok(())
    }

    /// Closes the election if the signature over the creator fingerprint is
    /// valid. The final count is published before the election is removed.
    pub fn close_election(&self, code: SessionCode, signature: &str) -> LiveResult<VotingResult> {
        let handle = self.session(code)?;
        let (snapshot, logging) = {
            let mut s = handle.lock();
            ensure!(!s.is_closed(), UnknownCodeSnafu { code });
            let creator = s.creator().clone();
            match self.inner.verifier.verify(
                &creator.public_key,
                creator.fingerprint.0.as_bytes(),
                signature,
            ) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("[CREATOR] invalid signature to close election {}", code);
                    return InvalidSignatureSnafu { code }.fail();
                }
                Err(message) => {
                    warn!(
                        "[CREATOR] could not check signature to close election {}: {}",
                        code, message
                    );
                    return SignatureCheckSnafu { code, message }.fail();
                }
            }
            s.close();
            (s.snapshot(), s.logging())
        };
        info!("[CREATOR] closing election {}", code);

        // Scheduled counts publish under the lock and only while open, so
        // nothing follows these events.
        let outcome = self.tabulate(code, snapshot);
        if let Ok((result, lines)) = &outcome {
            if logging {
                self.inner.sink.publish(
                    code,
                    OutboundEvent::AvOutput {
                        lines: lines.clone(),
                    },
                );
            }
            self.inner
                .sink
                .publish(code, OutboundEvent::winner_update(&result.winner));
            self.inner.sink.publish(code, OutboundEvent::CloseAccepted);
        }
        self.inner.registry.lock().destroy(code);
        outcome.map(|(result, _)| result)
    }

    /// The organizer is gone: the election ends without a final count.
    pub fn organizer_disconnected(&self, code: SessionCode) -> bool {
        let removed = self.inner.registry.lock().destroy(code);
        match removed {
            Some(handle) => {
                handle.lock().close();
                true
            }
            None => false,
        }
    }

    pub fn active_elections(&self) -> Vec<SessionCode> {
        self.inner.registry.lock().codes()
    }

    fn session(&self, code: SessionCode) -> LiveResult<SessionHandle> {
        let found = self.inner.registry.lock().find_by_code(code);
        match found {
            Some(h) => Ok(h),
            None => {
                debug!("session: no election with code {}", code);
                UnknownCodeSnafu { code }.fail()
            }
        }
    }

    // The task holds on to the session itself: the code may be handed to
    // another election once this one is gone.
    fn schedule_count(&self, code: SessionCode, handle: SessionHandle) {
        let service = self.clone();
        let delay = self.inner.settings.debounce;
        debug!("schedule_count: election {} counted in {:?}", code, delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.run_scheduled_count(code, handle);
        });
    }

    fn run_scheduled_count(&self, code: SessionCode, handle: SessionHandle) {
        let snapshot = {
            let mut s = handle.lock();
            if s.is_closed() {
                debug!("run_scheduled_count: election {} is closed", code);
                return;
            }
            s.snapshot()
        };
        let counted = snapshot.ballots.len();
        let outcome = self.tabulate(code, snapshot);
        if self.finish_scheduled_count(code, &handle, counted, outcome) {
            self.schedule_count(code, handle);
        }
    }

    /// Publishes the outcome of a scheduled count, unless the election was
    /// closed meanwhile. Returns true if another count is owed.
    fn finish_scheduled_count(
        &self,
        code: SessionCode,
        handle: &SessionHandle,
        counted: usize,
        outcome: LiveResult<(VotingResult, Vec<String>)>,
    ) -> bool {
        let mut s = handle.lock();
        if s.is_closed() {
            debug!("finish_scheduled_count: election {} closed during the count", code);
            return false;
        }
        match outcome {
            Ok((result, lines)) => {
                if s.logging() {
                    self.inner.sink.publish(code, OutboundEvent::AvOutput { lines });
                }
                if s.record_winner(result.winner.id) {
                    info!("[AV] {}: new leader {}", code, result.winner.name);
                    self.inner
                        .sink
                        .publish(code, OutboundEvent::winner_update(&result.winner));
                }
            }
            Err(e) => warn!("[AV] {}: count failed: {}", code, e),
        }
        s.finish_count(counted)
    }

    fn tabulate(
        &self,
        code: SessionCode,
        snapshot: TallySnapshot,
    ) -> LiveResult<(VotingResult, Vec<String>)> {
        let TallySnapshot {
            candidates,
            ballots,
            mut rng,
        } = snapshot;
        let result = run_instant_runoff(&candidates, &ballots, &self.inner.settings.rules, &mut rng)
            .context(TabulationSnafu {})?;
        let lines = result.trace_lines();
        for line in lines.iter() {
            info!("[AV] {}: {}", code, line);
        }
        Ok((result, lines))
    }
}

// Every preference must name a candidate of the election, at most once.
fn check_ballot(candidates: &[Candidate], ballot: &Ballot) -> Result<(), String> {
    let known: HashSet<CandidateId> = candidates.iter().map(|c| c.id).collect();
    let mut seen: HashSet<CandidateId> = HashSet::new();
    for cid in ballot.choices.iter() {
        if !known.contains(cid) {
            return Err(format!("unknown candidate id {}", cid));
        }
        if !seen.insert(*cid) {
            return Err(format!("candidate id {} is ranked twice", cid));
        }
    }
    Ok(())
}
