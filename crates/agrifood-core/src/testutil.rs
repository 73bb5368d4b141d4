//! Shared helpers for in-crate unit tests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::host::MemoryHost;
use crate::party::{Party, Role};
use crate::store::{PARTIES_KEY, Store};

/// Fixed transaction binding nonce for tests.
pub(crate) const BINDING: &[u8] = b"test-binding";

/// An Ed25519 keypair plus its base64 certificate encoding.
pub(crate) struct TestKey {
    pub signing: SigningKey,
    pub cert: String,
}

pub(crate) fn keypair() -> TestKey {
    let signing = SigningKey::generate(&mut OsRng);
    let cert = BASE64.encode(signing.verifying_key().as_bytes());
    TestKey { signing, cert }
}

/// Installs caller credentials on `host` as if `key` signed a transaction
/// carrying `payload`.
pub(crate) fn sign_in(host: &MemoryHost, key: &TestKey, payload: &[u8]) {
    let mut message = payload.to_vec();
    message.extend_from_slice(BINDING);
    let sigma = key.signing.sign(&message).to_bytes().to_vec();
    host.set_caller(sigma, payload.to_vec(), BINDING.to_vec());
}

/// Parses an RFC 3339 timestamp, panicking on malformed test input.
pub(crate) fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("test timestamp")
        .with_timezone(&Utc)
}

/// Registers a party directly in world-state, bypassing admin auth.
pub(crate) fn seed_party(host: &MemoryHost, id: &str, role: Role, cert: &str) {
    let store = Store::new(host);
    let mut parties: Vec<Party> = store.load(PARTIES_KEY).expect("load parties");
    parties.push(Party {
        id: id.to_string(),
        role,
        certs: vec![cert.to_string()],
    });
    store.save(PARTIES_KEY, &parties).expect("save parties");
}
