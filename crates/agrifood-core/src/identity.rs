//! Caller authentication for the current transaction.
//!
//! The host hands the core three pieces of raw credential material: the
//! transaction signature sigma, the canonical payload, and the binding
//! nonce. A caller is authenticated as a party (or as an admin) when at
//! least one certificate registered to that identity verifies sigma over
//! `payload ∥ binding`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::party::Party;
use crate::store::{ADMIN_CERTS_KEY, PARTIES_KEY, Store};

/// Verifies the invoking caller against registered certificates.
#[derive(Clone, Copy)]
pub struct Identity<'a> {
    host: &'a dyn LedgerHost,
}

impl<'a> Identity<'a> {
    /// Creates a verifier bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self { host }
    }

    /// Checks whether the caller signed this transaction with the key behind
    /// `certificate` (raw, already base64-decoded).
    ///
    /// The signature must cover `payload ∥ binding`; binding the transaction
    /// nonce into the signed message defeats copying attacks.
    ///
    /// # Errors
    ///
    /// Propagates host credential-material and verification failures.
    pub fn is_caller(&self, certificate: &[u8]) -> ChainResult<bool> {
        let sigma = self.host.caller_metadata()?;
        let mut message = self.host.payload()?;
        message.extend_from_slice(&self.host.binding()?);
        self.host.verify_signature(certificate, &sigma, &message)
    }

    /// Checks the caller against a list of base64-encoded certificates; any
    /// match authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CertDecode`] if a listed certificate is not
    /// valid base64; propagates host failures.
    pub fn verify_against(&self, certs: &[String]) -> ChainResult<bool> {
        for encoded in certs {
            let decoded = BASE64
                .decode(encoded)
                .map_err(|_| ChainError::CertDecode)?;
            if self.is_caller(&decoded)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks the caller against the registered admin certificate set.
    ///
    /// # Errors
    ///
    /// Propagates store and verification failures.
    pub fn verify_admin(&self) -> ChainResult<bool> {
        let admin_certs: Vec<String> = Store::new(self.host).load(ADMIN_CERTS_KEY)?;
        self.verify_against(&admin_certs)
    }

    /// Resolves the caller to a registered party.
    ///
    /// Parties are scanned in insertion order and the first whose certificate
    /// set matches wins, so one physical key can never act as two distinct
    /// parties.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownCaller`] if no party's certificate set
    /// matches the transaction signature.
    pub fn caller_party(&self) -> ChainResult<Party> {
        let parties: Vec<Party> = Store::new(self.host).load(PARTIES_KEY)?;
        for party in parties {
            if self.verify_against(&party.certs)? {
                return Ok(party);
            }
        }
        Err(ChainError::UnknownCaller)
    }
}
