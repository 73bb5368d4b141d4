//! Host ledger interface.
//!
//! The core runs inside a transaction context supplied by a replicated
//! key-value ledger. This module defines the [`LedgerHost`] trait the core
//! consumes: atomic per-transaction state access, the invoking caller's raw
//! credentials, and signature verification against a public certificate.
//!
//! All methods are synchronous; the host linearizes transactions and commits
//! writes atomically at end-of-transaction, so the core never needs locking
//! or rollback of its own.
//!
//! [`MemoryHost`] is the bundled reference implementation: a `BTreeMap`
//! world-state with Ed25519 signature verification. It backs every test in
//! the crate and doubles as documentation of the host contract.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::{ChainError, ChainResult};

/// The transaction context the host ledger exposes to the core.
///
/// # Object safety
///
/// The trait is object-safe; the dispatcher holds a `&dyn LedgerHost` for
/// the duration of one transaction and nothing longer.
pub trait LedgerHost {
    /// Reads the blob stored under `key`.
    ///
    /// A key that has never been written yields an empty blob, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::StoreRead`] if the underlying store fails.
    fn get_state(&self, key: &str) -> ChainResult<Vec<u8>>;

    /// Stages `value` under `key` for the end-of-transaction commit.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::StoreWrite`] if the underlying store fails.
    fn put_state(&self, key: &str, value: Vec<u8>) -> ChainResult<()>;

    /// The transaction signature sigma supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CryptoFail`] if the host cannot produce the
    /// caller metadata.
    fn caller_metadata(&self) -> ChainResult<Vec<u8>>;

    /// Canonical encoding of the invoked function name and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CryptoFail`] if the host cannot produce the
    /// payload.
    fn payload(&self) -> ChainResult<Vec<u8>>;

    /// The transaction binding nonce (guards against copying attacks).
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CryptoFail`] if the host cannot produce the
    /// binding.
    fn binding(&self) -> ChainResult<Vec<u8>>;

    /// Verifies `sigma` over `message` against the public `certificate`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CryptoFail`] if the certificate cannot be
    /// interpreted. A signature that simply does not match yields
    /// `Ok(false)`.
    fn verify_signature(
        &self,
        certificate: &[u8],
        sigma: &[u8],
        message: &[u8],
    ) -> ChainResult<bool>;
}

/// Caller credentials for the transaction currently in flight.
#[derive(Debug, Clone, Default)]
struct CallerMaterial {
    metadata: Vec<u8>,
    payload: Vec<u8>,
    binding: Vec<u8>,
}

/// In-memory [`LedgerHost`] with Ed25519 signature verification.
///
/// World-state lives in a `BTreeMap`; certificates are raw Ed25519 verifying
/// keys (the base64 layer is peeled off by the identity verifier before the
/// bytes reach the host). Tests install caller credentials with
/// [`MemoryHost::set_caller`] before each simulated transaction.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: RwLock<BTreeMap<String, Vec<u8>>>,
    caller: RwLock<CallerMaterial>,
}

impl MemoryHost {
    /// Creates an empty host with no world-state and no caller credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the caller credentials for the next transaction.
    pub fn set_caller(&self, metadata: Vec<u8>, payload: Vec<u8>, binding: Vec<u8>) {
        if let Ok(mut caller) = self.caller.write() {
            *caller = CallerMaterial {
                metadata,
                payload,
                binding,
            };
        }
    }
}

impl LedgerHost for MemoryHost {
    fn get_state(&self, key: &str) -> ChainResult<Vec<u8>> {
        let state = self.state.read().map_err(|_| ChainError::StoreRead {
            key: key.to_string(),
        })?;
        Ok(state.get(key).cloned().unwrap_or_default())
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> ChainResult<()> {
        let mut state = self.state.write().map_err(|_| ChainError::StoreWrite {
            key: key.to_string(),
        })?;
        state.insert(key.to_string(), value);
        Ok(())
    }

    fn caller_metadata(&self) -> ChainResult<Vec<u8>> {
        let caller = self.caller.read().map_err(|_| ChainError::CryptoFail)?;
        Ok(caller.metadata.clone())
    }

    fn payload(&self) -> ChainResult<Vec<u8>> {
        let caller = self.caller.read().map_err(|_| ChainError::CryptoFail)?;
        Ok(caller.payload.clone())
    }

    fn binding(&self) -> ChainResult<Vec<u8>> {
        let caller = self.caller.read().map_err(|_| ChainError::CryptoFail)?;
        Ok(caller.binding.clone())
    }

    fn verify_signature(
        &self,
        certificate: &[u8],
        sigma: &[u8],
        message: &[u8],
    ) -> ChainResult<bool> {
        let key_bytes: [u8; 32] = certificate
            .try_into()
            .map_err(|_| ChainError::CryptoFail)?;
        let verifying_key =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| ChainError::CryptoFail)?;

        let Ok(signature) = Signature::from_slice(sigma) else {
            return Ok(false);
        };

        Ok(verifying_key.verify(message, &signature).is_ok())
    }
}
