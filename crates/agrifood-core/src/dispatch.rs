//! Function-name dispatch for mutations and read-only queries.
//!
//! The host hands every transaction to one of three entry points: `init`
//! seeds the world-state, `invoke` runs a mutation, `query` runs a read-only
//! lookup. Arguments arrive as positional strings; the dispatcher enforces
//! arity, rejects empty required fields, parses timestamps and roles, and
//! routes to the registries. Mutations answer with a UTF-8 message, queries
//! with JSON.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::accreditation::AccreditationRegistry;
use crate::authorization::AuthorizationRegistry;
use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;
use crate::party::{PartyRegistry, Role};
use crate::provenance::ProvenanceEngine;
use crate::store::Store;

/// Entry point of the trust-chain core for one host transaction.
#[derive(Clone, Copy)]
pub struct TrustChain<'a> {
    host: &'a dyn LedgerHost,
}

impl<'a> TrustChain<'a> {
    /// Binds the core to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self { host }
    }

    /// Initializes the world-state with empty collections and the bootstrap
    /// admin certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::BadArg`] for an empty certificate, plus store
    /// failures.
    pub fn init(&self, admin_cert: &str) -> ChainResult<()> {
        if admin_cert.is_empty() {
            return Err(ChainError::bad_arg(
                "init: required argument `admin_cert` is empty",
            ));
        }
        Store::new(self.host).init(admin_cert)?;
        info!("world-state initialized");
        Ok(())
    }

    /// Dispatches a mutating function call.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownFunction`] for an unrecognized name,
    /// [`ChainError::BadArg`] for arity/format violations, and whatever the
    /// routed operation reports.
    pub fn invoke(&self, function: &str, args: &[String]) -> ChainResult<Vec<u8>> {
        info!(function, "invoke");

        let message = match function {
            "add_admin" => {
                let [cert] = expect_args(function, ["cert"], args)?;
                PartyRegistry::new(self.host).add_admin(cert)?;
                "Added certificate to admin set".to_string()
            }
            "add_party" => {
                let [id, role, cert] = expect_args(function, ["id", "role", "cert"], args)?;
                let role = parse_role(function, role)?;
                let party = PartyRegistry::new(self.host).add_party(id, role, cert)?;
                format!("New party added: {}, role: {}", party.id, party.role)
            }
            "add_cert" => {
                let [cert] = expect_args(function, ["cert"], args)?;
                let party = PartyRegistry::new(self.host).add_cert(cert)?;
                format!("Added certificate to party {}", party.id)
            }
            "add_signing_accreditation" => {
                let [id, description, created, expires] =
                    expect_args(function, ["id", "description", "created", "expires"], args)?;
                let created = parse_timestamp(function, "created", created)?;
                let expires = parse_timestamp(function, "expires", expires)?;
                let accreditation =
                    AccreditationRegistry::new(self.host).add(id, description, created, expires)?;
                format!(
                    "New signing accreditation {} added by {}",
                    accreditation.id, accreditation.accreditation_body
                )
            }
            "issue_signing_accreditation" => {
                let [accreditation_id, cert_body_id] =
                    expect_args(function, ["accreditation_id", "cert_body_id"], args)?;
                let accreditation =
                    AccreditationRegistry::new(self.host).issue(accreditation_id, cert_body_id)?;
                format!(
                    "Successfully added {} as certification body on {}",
                    accreditation
                        .certification_body
                        .as_deref()
                        .unwrap_or_default(),
                    accreditation.id
                )
            }
            "revoke_signing_accreditation" => {
                let [accreditation_id, timestamp] =
                    expect_args(function, ["accreditation_id", "timestamp"], args)?;
                let revoked_at = parse_timestamp(function, "timestamp", timestamp)?;
                let accreditation =
                    AccreditationRegistry::new(self.host).revoke(accreditation_id, revoked_at)?;
                format!(
                    "Successfully revoked signing accreditation {}",
                    accreditation.id
                )
            }
            "grant_signing_authority" => {
                let [accreditation_id, farm_id, expires] =
                    expect_args(function, ["accreditation_id", "farm_id", "expires"], args)?;
                let expires = parse_timestamp(function, "expires", expires)?;
                let authorization = AuthorizationRegistry::new(self.host)
                    .grant(accreditation_id, farm_id, expires)?;
                format!(
                    "Successfully granted signing authority of {} to {}",
                    authorization.accreditation_id, authorization.authorized_party
                )
            }
            "revoke_signing_authority" => {
                let [accreditation_id, party_id, timestamp] =
                    expect_args(function, ["accreditation_id", "party_id", "timestamp"], args)?;
                let revoked_at = parse_timestamp(function, "timestamp", timestamp)?;
                let authorization = AuthorizationRegistry::new(self.host)
                    .revoke(accreditation_id, party_id, revoked_at)?;
                format!(
                    "Successfully revoked signing authority of {} for {}",
                    authorization.accreditation_id, authorization.authorized_party
                )
            }
            "create_grapes" => {
                let [uuid, created] = expect_args(function, ["uuid", "created"], args)?;
                let created = parse_timestamp(function, "created", created)?;
                let unit = ProvenanceEngine::new(self.host).create(uuid, created)?;
                format!(
                    "Successfully added grapes ({}), produced by {}",
                    unit.uuid, unit.producer
                )
            }
            "certify_grapes" => {
                let [uuid, accreditation_id, issued] =
                    expect_args(function, ["uuid", "accreditation_id", "issued"], args)?;
                let issued = parse_timestamp(function, "issued", issued)?;
                let unit = ProvenanceEngine::new(self.host).certify(uuid, accreditation_id, issued)?;
                format!("Successfully certified grapes: {}", unit.uuid)
            }
            "revoke_signature" => {
                let [uuid, accreditation_id, timestamp] =
                    expect_args(function, ["uuid", "accreditation_id", "timestamp"], args)?;
                let revoked_at = parse_timestamp(function, "timestamp", timestamp)?;
                let unit = ProvenanceEngine::new(self.host)
                    .revoke_signature(uuid, accreditation_id, revoked_at)?;
                format!(
                    "Successfully revoked signature of {accreditation_id} for grapes: {}",
                    unit.uuid
                )
            }
            "transfer_grapes" => {
                let [uuid, new_party_id, timestamp] =
                    expect_args(function, ["uuid", "new_party_id", "timestamp"], args)?;
                let timestamp = parse_timestamp(function, "timestamp", timestamp)?;
                let unit =
                    ProvenanceEngine::new(self.host).transfer(uuid, new_party_id, timestamp)?;
                let custodian = unit
                    .custodian()
                    .map(|c| c.party_id.clone())
                    .unwrap_or_default();
                format!("Successfully transferred grapes {} to {custodian}", unit.uuid)
            }
            _ => {
                return Err(ChainError::UnknownFunction {
                    name: function.to_string(),
                });
            }
        };

        Ok(message.into_bytes())
    }

    /// Dispatches a read-only query. No caller authentication is required.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownFunction`] for an unrecognized name,
    /// [`ChainError::BadArg`] for arity/format violations, and whatever the
    /// routed lookup reports.
    pub fn query(&self, function: &str, args: &[String]) -> ChainResult<Vec<u8>> {
        info!(function, "query");

        match function {
            "grape_provenance" => {
                let [uuid] = expect_args(function, ["uuid"], args)?;
                let unit = ProvenanceEngine::new(self.host).unit(uuid)?;
                to_json(function, &unit.provenance)
            }
            "grape_certification" => {
                let [uuid] = expect_args(function, ["uuid"], args)?;
                let unit = ProvenanceEngine::new(self.host).unit(uuid)?;
                to_json(function, &unit.signatures)
            }
            "signer_certs" => {
                let [farm_id] = expect_args(function, ["farm_id"], args)?;
                let party = PartyRegistry::new(self.host).find(farm_id)?;
                let authorizations = AuthorizationRegistry::new(self.host).for_party(&party.id)?;
                to_json(function, &authorizations)
            }
            _ => Err(ChainError::UnknownFunction {
                name: function.to_string(),
            }),
        }
    }
}

/// Checks arity and rejects empty required fields, returning the argument
/// slice as named string refs.
fn expect_args<'x, const N: usize>(
    function: &str,
    names: [&str; N],
    args: &'x [String],
) -> ChainResult<[&'x str; N]> {
    if args.len() != N {
        return Err(ChainError::bad_arg(format!(
            "{function} expects {N} argument(s), got {}",
            args.len()
        )));
    }
    let mut out = [""; N];
    for (slot, (name, value)) in out.iter_mut().zip(names.iter().zip(args)) {
        if value.is_empty() {
            return Err(ChainError::bad_arg(format!(
                "{function}: required argument `{name}` is empty"
            )));
        }
        *slot = value.as_str();
    }
    Ok(out)
}

fn parse_role(function: &str, value: &str) -> ChainResult<Role> {
    value
        .parse()
        .map_err(|_| ChainError::bad_arg(format!("{function}: unknown role `{value}`")))
}

fn parse_timestamp(function: &str, name: &str, value: &str) -> ChainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            ChainError::bad_arg(format!(
                "{function}: `{name}` is not an RFC 3339 timestamp: {value}"
            ))
        })
}

fn to_json<T: serde::Serialize>(function: &str, value: &T) -> ChainResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|_| ChainError::Encode {
        key: function.to_string(),
    })
}
