// A line-oriented transport: one JSON event per line on stdin, one JSON
// event per line on stdout.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use instant_runoff::{Ballot, Candidate};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::live::events::{Envelope, InboundEvent, OutboundEvent, WireCandidate};
use crate::live::registry::SessionCode;
use crate::live::service::{ElectionService, EventSink, ServiceSettings, SignatureVerifier};
use crate::live::session::{CreatorIdentity, Fingerprint, PublicKeyHandle};
use crate::live::*;

/// Writes every event to the standard output. The participants of an
/// election filter the lines by code.
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn publish(&self, code: SessionCode, event: OutboundEvent) {
        write_envelope(&Envelope {
            code: Some(code),
            event,
        });
    }
}

fn write_envelope(env: &Envelope) {
    match serde_json::to_string(env) {
        Ok(s) => {
            let mut out = std::io::stdout().lock();
            if let Err(e) = writeln!(out, "{}", s) {
                warn!("write_envelope: could not write event: {}", e);
            }
        }
        Err(e) => warn!("write_envelope: could not serialize {:?}: {}", env, e),
    }
}

/// Ed25519 signatures over the SHA-256 digest of the message.
///
/// Keys are 32 bytes and signatures 64 bytes, both hex encoded.
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        public_key: &PublicKeyHandle,
        message: &[u8],
        signature: &str,
    ) -> Result<bool, String> {
        let key_bytes = hex::decode(public_key.0.trim()).map_err(|e| format!("public key: {}", e))?;
        let key_arr: [u8; 32] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("public key has {} bytes, expected 32", key_bytes.len()))?;
        let key = VerifyingKey::from_bytes(&key_arr).map_err(|e| format!("public key: {}", e))?;

        let sig_bytes = hex::decode(signature.trim()).map_err(|e| format!("signature: {}", e))?;
        let sig_arr: [u8; 64] = sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("signature has {} bytes, expected 64", sig_bytes.len()))?;
        let sig = Signature::from_bytes(&sig_arr);

        let digest = Sha256::digest(message);
        Ok(key.verify(digest.as_slice(), &sig).is_ok())
    }
}

fn reply(code: Option<SessionCode>, event: OutboundEvent) -> Vec<Envelope> {
    vec![Envelope { code, event }]
}

fn error_reply(code: Option<SessionCode>, e: &LiveError) -> Vec<Envelope> {
    reply(
        code,
        OutboundEvent::Error {
            message: e.to_string(),
        },
    )
}

/// Runs one inbound event and returns the direct replies to its sender.
///
/// Events for all the participants of an election go through the sink of
/// the service instead.
pub fn handle_event(service: &ElectionService, event: InboundEvent) -> Vec<Envelope> {
    match event {
        InboundEvent::CreateElection {
            candidates,
            fingerprint,
            public_key,
            logging,
        } => {
            let creator = CreatorIdentity {
                fingerprint: Fingerprint(fingerprint),
                public_key: PublicKeyHandle(public_key),
            };
            let cands: Vec<Candidate> = candidates.into_iter().map(Candidate::from).collect();
            match service.create_election(cands, creator, logging) {
                Ok(code) => reply(Some(code), OutboundEvent::AssignCode { code }),
                Err(e) => error_reply(None, &e),
            }
        }
        InboundEvent::CheckCode { code, fingerprint } => {
            match service.check_code(code, &Fingerprint(fingerprint)) {
                Ok(cands) => reply(
                    Some(code),
                    OutboundEvent::ConfirmCode {
                        valid: true,
                        candidates: Some(cands.iter().map(WireCandidate::from).collect()),
                    },
                ),
                Err(LiveError::UnknownCode { .. }) => reply(
                    Some(code),
                    OutboundEvent::ConfirmCode {
                        valid: false,
                        candidates: None,
                    },
                ),
                Err(LiveError::DuplicateVoter { .. }) => {
                    reply(Some(code), OutboundEvent::VoterRejected)
                }
                Err(e) => error_reply(Some(code), &e),
            }
        }
        InboundEvent::CastVote {
            code,
            fingerprint,
            ballot,
        } => match service.cast_vote(code, Fingerprint(fingerprint), Ballot::from(ballot)) {
            Ok(()) => vec![],
            Err(LiveError::DuplicateVoter { .. }) => reply(Some(code), OutboundEvent::VoterRejected),
            Err(e) => error_reply(Some(code), &e),
        },
        InboundEvent::CloseElection { code, signature } => {
            match service.close_election(code, &signature) {
                Ok(_) => vec![],
                // Already logged: a bad close request is ignored.
                Err(LiveError::InvalidSignature { .. }) | Err(LiveError::SignatureCheck { .. }) => {
                    vec![]
                }
                Err(e) => error_reply(Some(code), &e),
            }
        }
        InboundEvent::OrganizerDisconnect { code } => {
            if service.organizer_disconnected(code) {
                info!("[CREATOR] organizer of election {} disconnected", code);
            }
            vec![]
        }
    }
}

/// Serves events read from the standard input until it is closed.
pub async fn serve(settings: ServiceSettings) -> LiveResult<()> {
    info!(
        "serve: reading events from stdin, debounce {:?}, rules {:?}",
        settings.debounce, settings.rules
    );
    let service = ElectionService::new(settings, Arc::new(StdoutSink), Arc::new(Ed25519Verifier));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(IoSnafu {})? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => {
                debug!("serve: event {:?}", event);
                for env in handle_event(&service, event) {
                    write_envelope(&env);
                }
            }
            Err(e) => {
                warn!("serve: cannot parse event {:?}: {}", line, e);
                write_envelope(&Envelope {
                    code: None,
                    event: OutboundEvent::Error {
                        message: format!("cannot parse event: {}", e),
                    },
                });
            }
        }
    }
    info!(
        "serve: end of input, {} elections still open",
        service.active_elections().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<OutboundEvent>>,
    }

    impl EventSink for Collect {
        fn publish(&self, _code: SessionCode, event: OutboundEvent) {
            self.events.lock().push(event);
        }
    }

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let digest = Sha256::digest(message.as_bytes());
        hex::encode(key.sign(digest.as_slice()).to_bytes())
    }

    fn public_key(key: &SigningKey) -> PublicKeyHandle {
        PublicKeyHandle(hex::encode(key.verifying_key().to_bytes()))
    }

    #[test]
    fn verifier_accepts_only_the_organizer() {
        let key = signing_key();
        let pk = public_key(&key);
        let v = Ed25519Verifier;
        assert_eq!(v.verify(&pk, b"organizer", &sign(&key, "organizer")), Ok(true));
        assert_eq!(v.verify(&pk, b"organizer", &sign(&key, "intruder")), Ok(false));

        let other = SigningKey::from_bytes(&[8u8; 32]);
        assert_eq!(v.verify(&pk, b"organizer", &sign(&other, "organizer")), Ok(false));
    }

    #[test]
    fn verifier_reports_garbage() {
        let key = signing_key();
        let pk = public_key(&key);
        let v = Ed25519Verifier;
        assert!(v.verify(&pk, b"organizer", "not hex").is_err());
        assert!(v.verify(&pk, b"organizer", "abcd").is_err());
        assert!(v
            .verify(&PublicKeyHandle("00ff".to_string()), b"organizer", &sign(&key, "organizer"))
            .is_err());
    }

    fn parse(s: &str) -> InboundEvent {
        serde_json::from_str(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn a_whole_election() {
        let sink = Arc::new(Collect::default());
        let settings = ServiceSettings {
            seed: Some(4),
            ..ServiceSettings::default()
        };
        let service = ElectionService::new(settings, sink.clone(), Arc::new(Ed25519Verifier));
        let key = signing_key();

        let create = format!(
            r#"{{"event":"create-election","candidates":[{{"id":0,"name":"Anna"}},{{"id":1,"name":"Bob"}}],"fingerprint":"organizer","publicKey":"{}"}}"#,
            public_key(&key).0
        );
        let replies = handle_event(&service, parse(&create));
        let code = match &replies[..] {
            [Envelope {
                code: Some(code),
                event: OutboundEvent::AssignCode { .. },
            }] => *code,
            x => panic!("unexpected replies {:?}", x),
        };

        let check = format!(
            r#"{{"event":"check-code","code":{},"fingerprint":"v1"}}"#,
            code
        );
        match &handle_event(&service, parse(&check))[..] {
            [Envelope {
                event:
                    OutboundEvent::ConfirmCode {
                        valid: true,
                        candidates: Some(c),
                    },
                ..
            }] => assert_eq!(c.len(), 2),
            x => panic!("unexpected replies {:?}", x),
        }

        let vote = format!(
            r#"{{"event":"cast-vote","code":{},"fingerprint":"v1","ballot":[1,0]}}"#,
            code
        );
        assert!(handle_event(&service, parse(&vote)).is_empty());
        assert_eq!(
            handle_event(&service, parse(&vote)),
            vec![Envelope {
                code: Some(code),
                event: OutboundEvent::VoterRejected
            }]
        );

        let bad_close = format!(
            r#"{{"event":"close-election","code":{},"signature":"{}"}}"#,
            code,
            sign(&key, "someone")
        );
        assert!(handle_event(&service, parse(&bad_close)).is_empty());
        assert_eq!(service.active_elections(), vec![code]);

        let close = format!(
            r#"{{"event":"close-election","code":{},"signature":"{}"}}"#,
            code,
            sign(&key, "organizer")
        );
        assert!(handle_event(&service, parse(&close)).is_empty());
        assert_eq!(
            sink.events.lock().clone(),
            vec![
                OutboundEvent::WinnerUpdate {
                    id: 1,
                    name: "Bob".to_string()
                },
                OutboundEvent::CloseAccepted
            ]
        );

        match &handle_event(&service, parse(&check))[..] {
            [Envelope {
                event: OutboundEvent::ConfirmCode { valid: false, .. },
                ..
            }] => {}
            x => panic!("unexpected replies {:?}", x),
        }
        assert!(matches!(
            &handle_event(&service, parse(&close))[..],
            [Envelope {
                event: OutboundEvent::Error { .. },
                ..
            }]
        ));
    }

    #[test]
    fn invalid_elections_get_an_error() {
        let service = ElectionService::new(
            ServiceSettings::default(),
            Arc::new(Collect::default()),
            Arc::new(Ed25519Verifier),
        );
        let replies = handle_event(
            &service,
            parse(r#"{"event":"create-election","candidates":[],"fingerprint":"o","publicKey":"k"}"#),
        );
        assert!(matches!(
            &replies[..],
            [Envelope {
                code: None,
                event: OutboundEvent::Error { .. }
            }]
        ));
    }
}
