//! Shared helpers for end-to-end tests: keyed actors driving the dispatcher
//! through the in-memory host, with real Ed25519 transaction signatures.

use agrifood_core::dispatch::TrustChain;
use agrifood_core::error::ChainResult;
use agrifood_core::host::MemoryHost;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

/// Fixed transaction binding nonce; the host would derive one per
/// transaction.
pub const BINDING: &[u8] = b"tx-binding";

/// A keyed participant able to sign transactions.
pub struct Actor {
    signing: SigningKey,
    /// Base64-encoded certificate registered on the ledger for this actor.
    pub cert: String,
}

impl Actor {
    /// Generates a fresh keypair.
    pub fn new() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let cert = BASE64.encode(signing.verifying_key().as_bytes());
        Self { signing, cert }
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut message = payload.to_vec();
        message.extend_from_slice(BINDING);
        self.signing.sign(&message).to_bytes().to_vec()
    }
}

/// A simulated ledger network: world-state plus the dispatcher.
pub struct TestNet {
    /// The in-memory host carrying world-state across transactions.
    pub host: MemoryHost,
}

impl TestNet {
    /// Initializes a network with `admin` holding the bootstrap admin
    /// certificate.
    pub fn new(admin: &Actor) -> Self {
        let host = MemoryHost::new();
        TrustChain::new(&host).init(&admin.cert).expect("init");
        Self { host }
    }

    /// Runs one mutating transaction signed by `actor`.
    pub fn invoke(&self, actor: &Actor, function: &str, args: &[&str]) -> ChainResult<String> {
        let owned: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        let payload = serde_json::to_vec(&(function, &owned)).expect("encode payload");
        self.host
            .set_caller(actor.sign(&payload), payload, BINDING.to_vec());

        let reply = TrustChain::new(&self.host).invoke(function, &owned)?;
        Ok(String::from_utf8(reply).expect("utf-8 reply"))
    }

    /// Runs one read-only query (no caller credentials required).
    pub fn query(&self, function: &str, args: &[&str]) -> ChainResult<serde_json::Value> {
        let owned: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        let reply = TrustChain::new(&self.host).query(function, &owned)?;
        Ok(serde_json::from_slice(&reply).expect("json reply"))
    }

    /// Registers `actor` as a party, signed by `admin`.
    pub fn register(&self, admin: &Actor, id: &str, role: &str, actor: &Actor) {
        self.invoke(admin, "add_party", &[id, role, &actor.cert])
            .unwrap_or_else(|err| panic!("registering {id} as {role}: {err}"));
    }
}
