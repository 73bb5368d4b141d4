//! Signing accreditation registry.
//!
//! An accreditation is a named, time-bounded signing authority owned by an
//! accreditation body. It is assigned to exactly one certification body,
//! which may then delegate it to farms. Revocation is terminal and may come
//! from the owning accreditation body or from an auditor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::identity::Identity;
use crate::party::{PartyRegistry, Role};
use crate::store::{ACCREDITATIONS_KEY, Store};

/// Entity label used in accreditation errors.
const ENTITY: &str = "signing accreditation";

/// A named, time-bounded signing authority owned by an accreditation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SigningAccreditation {
    /// Globally unique accreditation identifier.
    #[serde(rename = "ID")]
    pub id: String,

    /// Human-readable description of what the accreditation certifies.
    pub description: String,

    /// Id of the accreditation body that owns this accreditation.
    pub accreditation_body: String,

    /// Id of the certification body it is assigned to, once issued.
    pub certification_body: Option<String>,

    /// When the accreditation was created.
    pub created: DateTime<Utc>,

    /// When the accreditation stops being usable.
    pub expires: DateTime<Utc>,

    /// Terminal revocation flag.
    pub revoked: bool,

    /// When revocation happened; written exactly once.
    #[serde(rename = "RevocationTimestamp")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SigningAccreditation {
    /// Whether the accreditation has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}

/// Registry managing the accreditation lifecycle.
#[derive(Clone, Copy)]
pub struct AccreditationRegistry<'a> {
    store: Store<'a>,
    identity: Identity<'a>,
    parties: PartyRegistry<'a>,
}

impl<'a> AccreditationRegistry<'a> {
    /// Creates a registry bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self {
            store: Store::new(host),
            identity: Identity::new(host),
            parties: PartyRegistry::new(host),
        }
    }

    /// Registers a new accreditation owned by the calling accreditation
    /// body.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] unless the caller is an
    /// `AccreditationBody`, [`ChainError::BadState`] if `created` is after
    /// `expires`, and [`ChainError::Duplicate`] on id collision.
    pub fn add(
        &self,
        id: &str,
        description: &str,
        created: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> ChainResult<SigningAccreditation> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::AccreditationBody {
            return Err(ChainError::unauthorized(
                "caller is not an AccreditationBody",
            ));
        }
        if created > expires {
            return Err(ChainError::bad_state(
                "accreditation would expire before it is created",
            ));
        }

        let accreditation = SigningAccreditation {
            id: id.to_string(),
            description: description.to_string(),
            accreditation_body: caller.id.clone(),
            certification_body: None,
            created,
            expires,
            revoked: false,
            revoked_at: None,
        };
        self.store.insert_unique(
            ACCREDITATIONS_KEY,
            accreditation.clone(),
            ENTITY,
            |a| a.id.clone(),
        )?;

        info!(accreditation = %accreditation.id, owner = %caller.id, "signing accreditation added");
        Ok(accreditation)
    }

    /// Assigns the accreditation to a certification body.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] unless the caller is the owning
    /// accreditation body, [`ChainError::Expired`] past the accreditation's
    /// expiry, [`ChainError::NotFound`] for a missing accreditation or
    /// target party, and [`ChainError::BadArg`] if the target is not a
    /// `CertificationBody`.
    pub fn issue(&self, accreditation_id: &str, cert_body_id: &str) -> ChainResult<SigningAccreditation> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::AccreditationBody {
            return Err(ChainError::unauthorized(
                "caller is not an AccreditationBody",
            ));
        }

        let mut accreditation = self.find(accreditation_id)?;
        if accreditation.is_expired() {
            return Err(ChainError::Expired {
                entity: ENTITY,
                id: accreditation.id,
            });
        }
        if accreditation.accreditation_body != caller.id {
            return Err(ChainError::unauthorized(format!(
                "{} does not own accreditation {}",
                caller.id, accreditation.id
            )));
        }

        let target = self.parties.find(cert_body_id)?;
        if target.role != Role::CertificationBody {
            return Err(ChainError::bad_arg(format!(
                "party {} is not a CertificationBody",
                target.id
            )));
        }

        accreditation.certification_body = Some(target.id.clone());
        self.update(&accreditation)?;

        info!(
            accreditation = %accreditation.id,
            certification_body = %target.id,
            "signing accreditation issued"
        );
        Ok(accreditation)
    }

    /// Marks the accreditation revoked at `revoked_at`.
    ///
    /// An owning accreditation body or any auditor may revoke; re-revocation
    /// succeeds without rewriting the original revocation timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] for callers outside the policy
    /// and [`ChainError::NotFound`] for a missing accreditation.
    pub fn revoke(
        &self,
        accreditation_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> ChainResult<SigningAccreditation> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::AccreditationBody && caller.role != Role::Auditor {
            return Err(ChainError::unauthorized(
                "caller is not an AccreditationBody or Auditor",
            ));
        }

        let mut accreditation = self.find(accreditation_id)?;
        if caller.role == Role::AccreditationBody
            && accreditation.accreditation_body != caller.id
        {
            return Err(ChainError::unauthorized(format!(
                "{} does not own accreditation {}",
                caller.id, accreditation.id
            )));
        }

        if accreditation.revoked {
            debug!(accreditation = %accreditation.id, "accreditation already revoked");
            return Ok(accreditation);
        }
        accreditation.revoked = true;
        accreditation.revoked_at = Some(revoked_at);
        self.update(&accreditation)?;

        info!(accreditation = %accreditation.id, by = %caller.id, "signing accreditation revoked");
        Ok(accreditation)
    }

    /// Looks up an accreditation by id.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotFound`] if no accreditation has this id.
    pub fn find(&self, id: &str) -> ChainResult<SigningAccreditation> {
        let accreditations: Vec<SigningAccreditation> = self.store.load(ACCREDITATIONS_KEY)?;
        accreditations
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ChainError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    fn update(&self, accreditation: &SigningAccreditation) -> ChainResult<()> {
        self.store
            .update_by(ACCREDITATIONS_KEY, accreditation.clone(), |a: &SigningAccreditation| {
                a.id == accreditation.id
            })
    }
}
