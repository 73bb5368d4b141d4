//! Grape-unit provenance engine.
//!
//! A grape unit carries two append-only histories: the custody chain
//! (provenance entries with strictly increasing transfer timestamps) and the
//! attached certificate signatures. Attaching a signature re-validates the
//! full trust chain at that instant: the farm's authorization and the
//! backing accreditation must both be unrevoked and unexpired. Units are
//! never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accreditation::AccreditationRegistry;
use crate::authorization::AuthorizationRegistry;
use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::identity::Identity;
use crate::party::{PartyRegistry, Role};
use crate::store::{GRAPE_UNITS_KEY, Store};

/// Entity label used in grape-unit errors.
const ENTITY: &str = "grape unit";

/// A signature embedded in a grape unit, asserting that an accreditation was
/// applied by an issuer at a point in time.
///
/// Interpreting a signature later requires re-validating the trust chain it
/// was issued under; the unit stores the raw assertion only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateSignature {
    /// Id of the farm that attached the signature.
    pub issuer: String,

    /// Id of the accreditation the signature was issued under.
    ///
    /// Persisted as `CertificateID` for compatibility with existing
    /// world-state.
    #[serde(rename = "CertificateID")]
    pub accreditation_id: String,

    /// When the signature was attached.
    pub issued: DateTime<Utc>,

    /// Terminal revocation flag.
    pub revoked: bool,

    /// When revocation happened; written exactly once.
    #[serde(rename = "RevocationTimestamp")]
    pub revoked_at: Option<DateTime<Utc>>,
}

/// One custody hop in a grape unit's provenance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvenanceEntry {
    /// Id of the party holding custody from this entry on.
    #[serde(rename = "PartyID")]
    pub party_id: String,

    /// When custody changed hands.
    pub timestamp: DateTime<Utc>,
}

/// A physical produce unit tracked on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GrapeUnit {
    /// Id of the farm that produced the unit.
    pub producer: String,

    /// When the unit was created.
    pub created: DateTime<Utc>,

    /// Globally unique unit identifier.
    #[serde(rename = "UUID")]
    pub uuid: String,

    /// Attached certificate signatures, in issue order.
    #[serde(rename = "CertificateSignatures")]
    pub signatures: Vec<CertificateSignature>,

    /// Custody chain; the first entry is always the producer at creation
    /// time and the last entry is the current custodian.
    pub provenance: Vec<ProvenanceEntry>,
}

impl GrapeUnit {
    /// The party currently holding custody.
    #[must_use]
    pub fn custodian(&self) -> Option<&ProvenanceEntry> {
        self.provenance.last()
    }
}

/// Engine for grape-unit creation, certification, signature revocation, and
/// custody transfer.
#[derive(Clone, Copy)]
pub struct ProvenanceEngine<'a> {
    store: Store<'a>,
    identity: Identity<'a>,
    parties: PartyRegistry<'a>,
    accreditations: AccreditationRegistry<'a>,
    authorizations: AuthorizationRegistry<'a>,
}

impl<'a> ProvenanceEngine<'a> {
    /// Creates an engine bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self {
            store: Store::new(host),
            identity: Identity::new(host),
            parties: PartyRegistry::new(host),
            accreditations: AccreditationRegistry::new(host),
            authorizations: AuthorizationRegistry::new(host),
        }
    }

    /// Creates a grape unit produced by the calling farm.
    ///
    /// The provenance chain starts with the producer at creation time.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] unless the caller is a `Farm`
    /// and [`ChainError::Duplicate`] on a uuid collision.
    pub fn create(&self, uuid: &str, created: DateTime<Utc>) -> ChainResult<GrapeUnit> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::Farm {
            return Err(ChainError::unauthorized("caller is not a Farm"));
        }

        let unit = GrapeUnit {
            producer: caller.id.clone(),
            created,
            uuid: uuid.to_string(),
            signatures: Vec::new(),
            provenance: vec![ProvenanceEntry {
                party_id: caller.id.clone(),
                timestamp: created,
            }],
        };
        self.store
            .insert_unique(GRAPE_UNITS_KEY, unit.clone(), ENTITY, |u| u.uuid.clone())?;

        info!(unit = %unit.uuid, producer = %unit.producer, "grape unit created");
        Ok(unit)
    }

    /// Attaches a certificate signature to a unit under an accreditation.
    ///
    /// Only the producing farm may certify, and only while the whole trust
    /// chain is live: the farm's authorization for the accreditation and the
    /// accreditation itself must both be unrevoked and unexpired at the
    /// instant of the call. Signatures accumulate; earlier ones are never
    /// deduplicated or refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`], [`ChainError::NotFound`],
    /// [`ChainError::Revoked`], or [`ChainError::Expired`] for the first
    /// link of the chain that fails.
    pub fn certify(
        &self,
        uuid: &str,
        accreditation_id: &str,
        issued: DateTime<Utc>,
    ) -> ChainResult<GrapeUnit> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::Farm {
            return Err(ChainError::unauthorized("caller is not a Farm"));
        }

        let mut unit = self.unit(uuid)?;
        if unit.producer != caller.id {
            return Err(ChainError::unauthorized(format!(
                "{} is not the producer of grape unit {}",
                caller.id, unit.uuid
            )));
        }

        let authorization = self.authorizations.find(accreditation_id, &caller.id)?;
        if authorization.revoked {
            return Err(ChainError::Revoked {
                entity: "signing authorization",
                id: format!("{accreditation_id}/{}", caller.id),
            });
        }
        if authorization.is_expired() {
            return Err(ChainError::Expired {
                entity: "signing authorization",
                id: format!("{accreditation_id}/{}", caller.id),
            });
        }

        let accreditation = self.accreditations.find(&authorization.accreditation_id)?;
        if accreditation.revoked {
            return Err(ChainError::Revoked {
                entity: "signing accreditation",
                id: accreditation.id,
            });
        }
        if accreditation.is_expired() {
            return Err(ChainError::Expired {
                entity: "signing accreditation",
                id: accreditation.id,
            });
        }

        unit.signatures.push(CertificateSignature {
            issuer: caller.id.clone(),
            accreditation_id: accreditation.id.clone(),
            issued,
            revoked: false,
            revoked_at: None,
        });
        self.update(&unit)?;

        info!(
            unit = %unit.uuid,
            accreditation = %accreditation.id,
            signatures = unit.signatures.len(),
            "grape unit certified"
        );
        Ok(unit)
    }

    /// Revokes the first signature on the unit issued under
    /// `accreditation_id`.
    ///
    /// The producing farm or any auditor may revoke. Revoking an already
    /// revoked signature keeps the original revocation timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] for callers outside the policy,
    /// [`ChainError::NotFound`] for a missing unit, and
    /// [`ChainError::BadState`] when no signature under that accreditation
    /// exists.
    pub fn revoke_signature(
        &self,
        uuid: &str,
        accreditation_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> ChainResult<GrapeUnit> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::Farm && caller.role != Role::Auditor {
            return Err(ChainError::unauthorized("caller is not a Farm or Auditor"));
        }

        let mut unit = self.unit(uuid)?;
        if caller.role == Role::Farm && unit.producer != caller.id {
            return Err(ChainError::unauthorized(format!(
                "{} is not the producer of grape unit {}",
                caller.id, unit.uuid
            )));
        }

        let Some(signature) = unit
            .signatures
            .iter_mut()
            .find(|s| s.accreditation_id == accreditation_id)
        else {
            return Err(ChainError::bad_state(format!(
                "grape unit {uuid} carries no signature under {accreditation_id}"
            )));
        };
        if signature.revoked {
            debug!(unit = %unit.uuid, accreditation = %accreditation_id, "signature already revoked");
            return Ok(unit);
        }
        signature.revoked = true;
        signature.revoked_at = Some(revoked_at);
        self.update(&unit)?;

        info!(
            unit = %unit.uuid,
            accreditation = %accreditation_id,
            by = %caller.id,
            "signature revoked"
        );
        Ok(unit)
    }

    /// Transfers custody of a unit to another registered party.
    ///
    /// Only the current custodian (a farm or trader) may transfer, and the
    /// transfer timestamp must be strictly after the last provenance entry.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] if the caller's role or custody
    /// does not allow the transfer, [`ChainError::NotFound`] for a missing
    /// unit or target party, and [`ChainError::BadState`] for a
    /// non-monotonic timestamp.
    pub fn transfer(
        &self,
        uuid: &str,
        new_party_id: &str,
        timestamp: DateTime<Utc>,
    ) -> ChainResult<GrapeUnit> {
        let caller = self.identity.caller_party()?;
        if caller.role != Role::Farm && caller.role != Role::Trader {
            return Err(ChainError::unauthorized("caller is not a Farm or Trader"));
        }

        let mut unit = self.unit(uuid)?;
        let Some(custodian) = unit.custodian() else {
            return Err(ChainError::bad_state(format!(
                "grape unit {uuid} has an empty provenance chain"
            )));
        };
        if custodian.party_id != caller.id {
            return Err(ChainError::unauthorized(format!(
                "{} is not the current custodian of grape unit {}",
                caller.id, unit.uuid
            )));
        }
        if timestamp <= custodian.timestamp {
            return Err(ChainError::bad_state(
                "transfer timestamp must be after the latest provenance entry",
            ));
        }

        let new_party = self.parties.find(new_party_id)?;
        unit.provenance.push(ProvenanceEntry {
            party_id: new_party.id.clone(),
            timestamp,
        });
        self.update(&unit)?;

        info!(
            unit = %unit.uuid,
            from = %caller.id,
            to = %new_party.id,
            "grape unit transferred"
        );
        Ok(unit)
    }

    /// Looks up a grape unit by uuid.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotFound`] if no unit has this uuid.
    pub fn unit(&self, uuid: &str) -> ChainResult<GrapeUnit> {
        let units: Vec<GrapeUnit> = self.store.load(GRAPE_UNITS_KEY)?;
        units
            .into_iter()
            .find(|u| u.uuid == uuid)
            .ok_or_else(|| ChainError::NotFound {
                entity: ENTITY,
                id: uuid.to_string(),
            })
    }

    fn update(&self, unit: &GrapeUnit) -> ChainResult<()> {
        self.store
            .update_by(GRAPE_UNITS_KEY, unit.clone(), |u: &GrapeUnit| {
                u.uuid == unit.uuid
            })
    }
}
