//! Signing authorization registry.
//!
//! An authorization delegates an issued accreditation to a specific farm for
//! a bounded time. It is granted by the accreditation's certification body
//! and revoked by that body or by an auditor. Validity at use-time is
//! re-checked by the provenance engine against the whole trust chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accreditation::AccreditationRegistry;
use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::identity::Identity;
use crate::party::{PartyRegistry, Role};
use crate::store::{AUTHORIZATIONS_KEY, Store};

/// Entity label used in authorization errors.
const ENTITY: &str = "signing authorization";

/// Delegation of an accreditation to a farm, unique per
/// `(accreditation, farm)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SigningAuthorization {
    /// Id of the farm the authority is delegated to.
    pub authorized_party: String,

    /// Id of the accreditation being delegated.
    ///
    /// Persisted as `CertificateID` for compatibility with existing
    /// world-state.
    #[serde(rename = "CertificateID")]
    pub accreditation_id: String,

    /// When the delegation stops being usable.
    pub expires: DateTime<Utc>,

    /// Terminal revocation flag.
    pub revoked: bool,

    /// When revocation happened; written exactly once.
    #[serde(rename = "RevocationTimestamp")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SigningAuthorization {
    /// Whether the delegation has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}

/// Registry managing delegated signing authorities.
#[derive(Clone, Copy)]
pub struct AuthorizationRegistry<'a> {
    store: Store<'a>,
    identity: Identity<'a>,
    parties: PartyRegistry<'a>,
    accreditations: AccreditationRegistry<'a>,
}

impl<'a> AuthorizationRegistry<'a> {
    /// Creates a registry bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self {
            store: Store::new(host),
            identity: Identity::new(host),
            parties: PartyRegistry::new(host),
            accreditations: AccreditationRegistry::new(host),
        }
    }

    /// Grants a farm signing authority under an accreditation.
    ///
    /// The accreditation must be live (not expired, not revoked) and
    /// delegated to the calling certification body; the target party must be
    /// a farm; the `(accreditation, farm)` pair must be new; the authority's
    /// own expiry must still be in the future.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as [`ChainError::Unauthorized`],
    /// [`ChainError::NotFound`], [`ChainError::Expired`],
    /// [`ChainError::Revoked`], [`ChainError::BadArg`], or
    /// [`ChainError::Duplicate`].
    pub fn grant(
        &self,
        accreditation_id: &str,
        farm_id: &str,
        expires: DateTime<Utc>,
    ) -> ChainResult<SigningAuthorization> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::CertificationBody {
            return Err(ChainError::unauthorized(
                "caller is not a CertificationBody",
            ));
        }

        let accreditation = self.accreditations.find(accreditation_id)?;
        if accreditation.is_expired() {
            return Err(ChainError::Expired {
                entity: "signing accreditation",
                id: accreditation.id,
            });
        }
        if accreditation.revoked {
            return Err(ChainError::Revoked {
                entity: "signing accreditation",
                id: accreditation.id,
            });
        }
        if accreditation.certification_body.as_deref() != Some(caller.id.as_str()) {
            return Err(ChainError::unauthorized(format!(
                "{} is not the certification body of {}",
                caller.id, accreditation.id
            )));
        }

        let farm = self.parties.find(farm_id)?;
        if farm.role != Role::Farm {
            return Err(ChainError::bad_arg(format!(
                "party {} is not a Farm",
                farm.id
            )));
        }

        let authorization = SigningAuthorization {
            authorized_party: farm.id.clone(),
            accreditation_id: accreditation.id.clone(),
            expires,
            revoked: false,
            revoked_at: None,
        };
        if authorization.is_expired() {
            return Err(ChainError::Expired {
                entity: ENTITY,
                id: pair_id(&authorization),
            });
        }
        self.store
            .insert_unique(AUTHORIZATIONS_KEY, authorization.clone(), ENTITY, pair_id)?;

        info!(
            accreditation = %authorization.accreditation_id,
            farm = %authorization.authorized_party,
            "signing authority granted"
        );
        Ok(authorization)
    }

    /// Marks the `(accreditation, party)` authorization revoked.
    ///
    /// The accreditation's certification body or any auditor may revoke;
    /// re-revocation succeeds without rewriting the original revocation
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] for callers outside the policy
    /// and [`ChainError::NotFound`] for a missing accreditation or
    /// authorization.
    pub fn revoke(
        &self,
        accreditation_id: &str,
        party_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> ChainResult<SigningAuthorization> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::CertificationBody && caller.role != Role::Auditor {
            return Err(ChainError::unauthorized(
                "caller is not a CertificationBody or Auditor",
            ));
        }

        let accreditation = self.accreditations.find(accreditation_id)?;
        if caller.role == Role::CertificationBody
            && accreditation.certification_body.as_deref() != Some(caller.id.as_str())
        {
            return Err(ChainError::unauthorized(format!(
                "{} is not the certification body of {}",
                caller.id, accreditation.id
            )));
        }

        let mut authorization = self.find(accreditation_id, party_id)?;
        if authorization.revoked {
            debug!(
                accreditation = %authorization.accreditation_id,
                farm = %authorization.authorized_party,
                "authorization already revoked"
            );
            return Ok(authorization);
        }
        authorization.revoked = true;
        authorization.revoked_at = Some(revoked_at);
        let updated = authorization.clone();
        self.store
            .update_by(AUTHORIZATIONS_KEY, authorization, |a: &SigningAuthorization| {
                a.accreditation_id == accreditation_id && a.authorized_party == party_id
            })?;

        info!(
            accreditation = %updated.accreditation_id,
            farm = %updated.authorized_party,
            by = %caller.id,
            "signing authority revoked"
        );
        Ok(updated)
    }

    /// Looks up the authorization for an `(accreditation, party)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotFound`] if the pair was never granted.
    pub fn find(&self, accreditation_id: &str, party_id: &str) -> ChainResult<SigningAuthorization> {
        let authorizations: Vec<SigningAuthorization> = self.store.load(AUTHORIZATIONS_KEY)?;
        authorizations
            .into_iter()
            .find(|a| a.accreditation_id == accreditation_id && a.authorized_party == party_id)
            .ok_or_else(|| ChainError::NotFound {
                entity: ENTITY,
                id: format!("{accreditation_id}/{party_id}"),
            })
    }

    /// Returns every authorization (including revoked ones) delegated to
    /// `party_id`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn for_party(&self, party_id: &str) -> ChainResult<Vec<SigningAuthorization>> {
        let authorizations: Vec<SigningAuthorization> = self.store.load(AUTHORIZATIONS_KEY)?;
        Ok(authorizations
            .into_iter()
            .filter(|a| a.authorized_party == party_id)
            .collect())
    }
}

fn pair_id(authorization: &SigningAuthorization) -> String {
    format!(
        "{}/{}",
        authorization.accreditation_id, authorization.authorized_party
    )
}
