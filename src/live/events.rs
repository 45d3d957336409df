// The messages exchanged with voters and organizers.

use instant_runoff::{Candidate, CandidateId};
use serde::{Deserialize, Serialize};

use crate::live::registry::SessionCode;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WireCandidate {
    pub id: u32,
    pub name: String,
}

impl From<&Candidate> for WireCandidate {
    fn from(c: &Candidate) -> Self {
        WireCandidate {
            id: c.id.0,
            name: c.name.clone(),
        }
    }
}

impl From<WireCandidate> for Candidate {
    fn from(c: WireCandidate) -> Self {
        Candidate {
            id: CandidateId(c.id),
            name: c.name,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum InboundEvent {
    CreateElection {
        candidates: Vec<WireCandidate>,
        fingerprint: String,
        #[serde(rename = "publicKey")]
        public_key: String,
        #[serde(default)]
        logging: bool,
    },
    CheckCode {
        code: SessionCode,
        fingerprint: String,
    },
    CastVote {
        code: SessionCode,
        fingerprint: String,
        ballot: Vec<u32>,
    },
    CloseElection {
        code: SessionCode,
        signature: String,
    },
    OrganizerDisconnect {
        code: SessionCode,
    },
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OutboundEvent {
    AssignCode {
        code: SessionCode,
    },
    ConfirmCode {
        valid: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        candidates: Option<Vec<WireCandidate>>,
    },
    VoterRejected,
    WinnerUpdate {
        id: u32,
        name: String,
    },
    AvOutput {
        lines: Vec<String>,
    },
    CloseAccepted,
    Error {
        message: String,
    },
}

impl OutboundEvent {
    pub fn winner_update(winner: &Candidate) -> OutboundEvent {
        OutboundEvent::WinnerUpdate {
            id: winner.id.0,
            name: winner.name.clone(),
        }
    }
}

/// An outbound event, with the election it concerns if any.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<SessionCode>,
    #[serde(flatten)]
    pub event: OutboundEvent,
}
