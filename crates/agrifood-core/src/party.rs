//! Party registry: admins, parties, and their roles.
//!
//! Admin certificates form a flat super-user set able to register parties
//! and further admins. A party binds a stable identifier to one of the five
//! supply-chain roles and to a growing set of transaction certificates;
//! certificates are only ever added, never removed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::identity::Identity;
use crate::store::{ADMIN_CERTS_KEY, PARTIES_KEY, Store};

/// Closed set of supply-chain roles a party can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Defines signing accreditations and assigns them to certification
    /// bodies.
    AccreditationBody,
    /// Receives accreditations and delegates time-bounded signing authority
    /// to farms.
    CertificationBody,
    /// Produces grape units and attaches signatures under a granted
    /// authority.
    Farm,
    /// Out-of-band revoker of accreditations, authorizations, and
    /// signatures.
    Auditor,
    /// Takes custody of grape units via transfer.
    Trader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccreditationBody => "AccreditationBody",
            Self::CertificationBody => "CertificationBody",
            Self::Farm => "Farm",
            Self::Auditor => "Auditor",
            Self::Trader => "Trader",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AccreditationBody" => Ok(Self::AccreditationBody),
            "CertificationBody" => Ok(Self::CertificationBody),
            "Farm" => Ok(Self::Farm),
            "Auditor" => Ok(Self::Auditor),
            "Trader" => Ok(Self::Trader),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// A registered supply-chain participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Party {
    /// Globally unique party identifier.
    #[serde(rename = "ID")]
    pub id: String,

    /// The role this party acts under.
    pub role: Role,

    /// Base64-encoded transaction certificates registered to this party.
    pub certs: Vec<String>,
}

/// Registry of admins and parties.
#[derive(Clone, Copy)]
pub struct PartyRegistry<'a> {
    store: Store<'a>,
    identity: Identity<'a>,
}

impl<'a> PartyRegistry<'a> {
    /// Creates a registry bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self {
            store: Store::new(host),
            identity: Identity::new(host),
        }
    }

    /// Appends a certificate to the admin set. Admin-only.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] if the caller is not an admin,
    /// plus store and verification failures.
    pub fn add_admin(&self, cert: &str) -> ChainResult<()> {
        if !self.identity.verify_admin()? {
            return Err(ChainError::unauthorized("caller is not an admin"));
        }

        let mut admin_certs: Vec<String> = self.store.load(ADMIN_CERTS_KEY)?;
        admin_certs.push(cert.to_string());
        self.store.save(ADMIN_CERTS_KEY, &admin_certs)?;

        info!(total = admin_certs.len(), "admin certificate registered");
        Ok(())
    }

    /// Registers a new party. Admin-only.
    ///
    /// The certificate must not already belong to any party: identity
    /// resolution picks the first matching party, so a shared certificate
    /// would silently shadow the later registration.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Unauthorized`] for non-admin callers and
    /// [`ChainError::Duplicate`] when the id or the certificate is already
    /// registered.
    pub fn add_party(&self, id: &str, role: Role, cert: &str) -> ChainResult<Party> {
        if !self.identity.verify_admin()? {
            return Err(ChainError::unauthorized("caller is not an admin"));
        }

        let mut parties: Vec<Party> = self.store.load(PARTIES_KEY)?;
        if parties.iter().any(|p| p.id == id) {
            return Err(ChainError::Duplicate {
                entity: "party",
                id: id.to_string(),
            });
        }
        if parties.iter().any(|p| p.certs.iter().any(|c| c == cert)) {
            return Err(ChainError::Duplicate {
                entity: "party certificate",
                id: cert.to_string(),
            });
        }

        let party = Party {
            id: id.to_string(),
            role,
            certs: vec![cert.to_string()],
        };
        parties.push(party.clone());
        self.store.save(PARTIES_KEY, &parties)?;

        info!(party = %party.id, role = %party.role, "party registered");
        Ok(party)
    }

    /// Appends a certificate to the calling party's own certificate set.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownCaller`] if the caller is not a
    /// registered party and [`ChainError::Duplicate`] if the certificate
    /// already belongs to a party.
    pub fn add_cert(&self, cert: &str) -> ChainResult<Party> {
        let caller = self.identity.caller_party()?;

        let mut parties: Vec<Party> = self.store.load(PARTIES_KEY)?;
        if parties.iter().any(|p| p.certs.iter().any(|c| c == cert)) {
            return Err(ChainError::Duplicate {
                entity: "party certificate",
                id: cert.to_string(),
            });
        }

        let Some(slot) = parties.iter_mut().find(|p| p.id == caller.id) else {
            return Err(ChainError::UnknownCaller);
        };
        slot.certs.push(cert.to_string());
        let updated = slot.clone();
        self.store.save(PARTIES_KEY, &parties)?;

        info!(party = %updated.id, certs = updated.certs.len(), "certificate added to party");
        Ok(updated)
    }

    /// Looks up a party by id.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotFound`] if no party has this id.
    pub fn find(&self, id: &str) -> ChainResult<Party> {
        let parties: Vec<Party> = self.store.load(PARTIES_KEY)?;
        parties
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ChainError::NotFound {
                entity: "party",
                id: id.to_string(),
            })
    }
}
