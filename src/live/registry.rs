// The table of the elections currently running.

use instant_runoff::Candidate;
use log::{debug, info};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::live::session::{CreatorIdentity, ElectionSession};

pub const MIN_CODE: u32 = 100_000;
pub const MAX_CODE: u32 = 999_999;

/// The six-digit code under which voters find an election.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(pub u32);

impl Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type SessionHandle = Arc<Mutex<ElectionSession>>;

pub struct SessionRegistry<R: RngCore = StdRng> {
    sessions: HashMap<SessionCode, SessionHandle>,
    rng: R,
}

impl SessionRegistry<StdRng> {
    /// A registry drawing its codes from a seeded generator, or from the
    /// operating system when no seed is given.
    pub fn from_seed(seed: Option<u64>) -> SessionRegistry<StdRng> {
        SessionRegistry::new(crate::live::io_common::make_rng(seed))
    }
}

impl<R: RngCore> SessionRegistry<R> {
    pub fn new(rng: R) -> SessionRegistry<R> {
        SessionRegistry {
            sessions: HashMap::new(),
            rng,
        }
    }

    /// Opens a new election under a code that no running election holds.
    ///
    /// Codes of closed elections may be handed out again.
    pub fn create_session(
        &mut self,
        candidates: Vec<Candidate>,
        creator: CreatorIdentity,
        logging: bool,
    ) -> SessionCode {
        let code = self.fresh_code();
        self.insert_session(code, candidates, creator, logging);
        code
    }

    /// Opens an election under a code chosen by the caller.
    #[cfg(test)]
    pub(crate) fn create_session_at(
        &mut self,
        code: SessionCode,
        candidates: Vec<Candidate>,
        creator: CreatorIdentity,
        logging: bool,
    ) {
        assert!(!self.sessions.contains_key(&code));
        self.insert_session(code, candidates, creator, logging);
    }

    fn insert_session(
        &mut self,
        code: SessionCode,
        candidates: Vec<Candidate>,
        creator: CreatorIdentity,
        logging: bool,
    ) {
        let session_rng = StdRng::seed_from_u64(self.rng.gen());
        let session = ElectionSession::new(code, candidates, creator, logging, session_rng);
        self.sessions.insert(code, Arc::new(Mutex::new(session)));
        info!("[CREATOR] creating election {}", code);
    }

    fn fresh_code(&mut self) -> SessionCode {
        loop {
            let code = SessionCode(self.rng.gen_range(MIN_CODE..=MAX_CODE));
            if !self.sessions.contains_key(&code) {
                return code;
            }
            debug!("fresh_code: code {} already in use, drawing again", code);
        }
    }

    pub fn find_by_code(&self, code: SessionCode) -> Option<SessionHandle> {
        self.sessions.get(&code).cloned()
    }

    pub fn destroy(&mut self, code: SessionCode) -> Option<SessionHandle> {
        let res = self.sessions.remove(&code);
        if res.is_some() {
            info!("[CREATOR] deleting election {}", code);
        }
        res
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn codes(&self) -> Vec<SessionCode> {
        let mut res: Vec<SessionCode> = self.sessions.keys().cloned().collect();
        res.sort();
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::session::{Fingerprint, PublicKeyHandle};
    use std::collections::HashSet;

    fn creator() -> CreatorIdentity {
        CreatorIdentity {
            fingerprint: Fingerprint("org".to_string()),
            public_key: PublicKeyHandle("pk".to_string()),
        }
    }

    #[test]
    fn codes_are_six_digits_and_unique() {
        let mut reg = SessionRegistry::from_seed(Some(3));
        let mut seen: HashSet<SessionCode> = HashSet::new();
        for _ in 0..2000 {
            let code = reg.create_session(vec![Candidate::new(0, "a")], creator(), false);
            assert!(code.0 >= MIN_CODE && code.0 <= MAX_CODE);
            assert!(seen.insert(code));
        }
        assert_eq!(reg.len(), 2000);
    }

    #[test]
    fn find_and_destroy() {
        let mut reg = SessionRegistry::from_seed(Some(9));
        let code = reg.create_session(vec![Candidate::new(4, "x")], creator(), true);
        let handle = reg.find_by_code(code).unwrap();
        assert_eq!(handle.lock().code(), code);
        assert!(handle.lock().logging());
        assert_eq!(reg.codes(), vec![code]);

        assert!(reg.destroy(code).is_some());
        assert!(reg.find_by_code(code).is_none());
        assert!(reg.destroy(code).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_code_is_not_found() {
        let reg = SessionRegistry::from_seed(Some(1));
        assert!(reg.find_by_code(SessionCode(100000)).is_none());
    }

    #[test]
    fn same_seed_same_codes() {
        let mut a = SessionRegistry::from_seed(Some(5));
        let mut b = SessionRegistry::from_seed(Some(5));
        for _ in 0..10 {
            assert_eq!(
                a.create_session(vec![Candidate::new(0, "a")], creator(), false),
                b.create_session(vec![Candidate::new(0, "a")], creator(), false)
            );
        }
    }
}
