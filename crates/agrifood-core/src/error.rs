//! Unified error taxonomy for the trust-chain core.
//!
//! Every fallible operation in the crate returns [`ChainError`]. Errors are
//! never swallowed: they bubble up to the dispatcher, which hands them back
//! to the host unchanged. An operation that fails performs no `put_state`,
//! so the host's end-of-transaction commit leaves storage untouched.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors surfaced by the trust-chain core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainError {
    /// The dispatcher could not resolve the function name.
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// The unresolved function name.
        name: String,
    },

    /// Wrong argument count, unparseable timestamp, or empty required field.
    #[error("bad argument: {reason}")]
    BadArg {
        /// What was wrong with the arguments.
        reason: String,
    },

    /// The caller's role or identity does not satisfy the operation's policy.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Which policy rule the caller failed.
        reason: String,
    },

    /// No registered party's certificate set matched the transaction
    /// signature.
    #[error("no registered party matches the transaction signature")]
    UnknownCaller,

    /// A referenced party, accreditation, authorization, or grape unit does
    /// not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// A uniqueness invariant would be violated.
    #[error("duplicate {entity}: {id}")]
    Duplicate {
        /// The kind of record being inserted.
        entity: &'static str,
        /// The identifier that already exists.
        id: String,
    },

    /// An accreditation or authorization has passed its expiry.
    #[error("{entity} {id} has expired")]
    Expired {
        /// The kind of record that expired.
        entity: &'static str,
        /// The identifier of the expired record.
        id: String,
    },

    /// An accreditation or authorization is marked revoked.
    #[error("{entity} {id} is revoked")]
    Revoked {
        /// The kind of record that is revoked.
        entity: &'static str,
        /// The identifier of the revoked record.
        id: String,
    },

    /// A state-machine rule was violated (non-monotonic provenance
    /// timestamp, revocation of a signature that was never attached, ...).
    #[error("bad state: {reason}")]
    BadState {
        /// Which rule was violated.
        reason: String,
    },

    /// The host key-value store failed a read.
    #[error("failed reading `{key}` from the host store")]
    StoreRead {
        /// The collection key being read.
        key: String,
    },

    /// The host key-value store failed a write.
    #[error("failed writing `{key}` to the host store")]
    StoreWrite {
        /// The collection key being written.
        key: String,
    },

    /// A collection could not be serialized.
    #[error("failed encoding the `{key}` collection")]
    Encode {
        /// The collection key being serialized.
        key: String,
    },

    /// A stored blob could not be deserialized.
    #[error("failed decoding the `{key}` collection")]
    Decode {
        /// The collection key being deserialized.
        key: String,
    },

    /// A registered certificate could not be base64-decoded.
    #[error("failed decoding a registered certificate")]
    CertDecode,

    /// The host failed while verifying a transaction signature.
    #[error("host signature verification failed")]
    CryptoFail,
}

impl ChainError {
    /// Constructs a [`ChainError::BadArg`].
    pub fn bad_arg(reason: impl Into<String>) -> Self {
        Self::BadArg {
            reason: reason.into(),
        }
    }

    /// Constructs a [`ChainError::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Constructs a [`ChainError::BadState`].
    pub fn bad_state(reason: impl Into<String>) -> Self {
        Self::BadState {
            reason: reason.into(),
        }
    }

    /// Stable tag naming the error kind, independent of the message text.
    ///
    /// The host gateway matches on these tags when translating core errors
    /// into transport-level status codes.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::UnknownFunction { .. } => "UnknownFunction",
            Self::BadArg { .. } => "BadArg",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::UnknownCaller => "UnknownCaller",
            Self::NotFound { .. } => "NotFound",
            Self::Duplicate { .. } => "Duplicate",
            Self::Expired { .. } => "Expired",
            Self::Revoked { .. } => "Revoked",
            Self::BadState { .. } => "BadState",
            Self::StoreRead { .. } => "StoreRead",
            Self::StoreWrite { .. } => "StoreWrite",
            Self::Encode { .. } => "Encode",
            Self::Decode { .. } => "Decode",
            Self::CertDecode => "CertDecode",
            Self::CryptoFail => "CryptoFail",
        }
    }
}
