//! End-to-end scenarios over the dispatcher: the full delegated-trust chain
//! from admin bootstrap to certified, transferred grape units, plus the
//! denial paths for revocation, expiry, identity, and uniqueness.

mod common;

use agrifood_core::host::LedgerHost;
use common::{Actor, TestNet};
use serde_json::json;

/// Registers the standard cast: AB1, CB1, F1, AU1, T1.
struct Cast {
    admin: Actor,
    ab: Actor,
    cb: Actor,
    farm: Actor,
    auditor: Actor,
    trader: Actor,
}

fn cast() -> (TestNet, Cast) {
    let cast = Cast {
        admin: Actor::new(),
        ab: Actor::new(),
        cb: Actor::new(),
        farm: Actor::new(),
        auditor: Actor::new(),
        trader: Actor::new(),
    };
    let net = TestNet::new(&cast.admin);
    net.register(&cast.admin, "AB1", "AccreditationBody", &cast.ab);
    net.register(&cast.admin, "CB1", "CertificationBody", &cast.cb);
    net.register(&cast.admin, "F1", "Farm", &cast.farm);
    net.register(&cast.admin, "AU1", "Auditor", &cast.auditor);
    net.register(&cast.admin, "T1", "Trader", &cast.trader);
    (net, cast)
}

/// Walks the chain up to a certified unit U1 under accreditation AC1.
fn certify_u1(net: &TestNet, cast: &Cast) {
    net.invoke(
        &cast.ab,
        "add_signing_accreditation",
        &[
            "AC1",
            "organic",
            "2024-01-01T00:00:00Z",
            "2999-01-01T00:00:00Z",
        ],
    )
    .expect("add accreditation");
    net.invoke(&cast.ab, "issue_signing_accreditation", &["AC1", "CB1"])
        .expect("issue accreditation");
    net.invoke(
        &cast.cb,
        "grant_signing_authority",
        &["AC1", "F1", "2999-01-01T00:00:00Z"],
    )
    .expect("grant authority");
    net.invoke(&cast.farm, "create_grapes", &["U1", "2025-05-01T12:00:00Z"])
        .expect("create grapes");
    net.invoke(
        &cast.farm,
        "certify_grapes",
        &["U1", "AC1", "2025-05-02T09:00:00Z"],
    )
    .expect("certify grapes");
}

#[test]
fn happy_path_certification() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    let signatures = net
        .query("grape_certification", &["U1"])
        .expect("certification query");
    let signatures = signatures.as_array().expect("signature list");
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0]["Issuer"], "F1");
    assert_eq!(signatures[0]["CertificateID"], "AC1");
    assert_eq!(signatures[0]["Revoked"], false);

    let provenance = net
        .query("grape_provenance", &["U1"])
        .expect("provenance query");
    let provenance = provenance.as_array().expect("provenance list");
    assert_eq!(provenance.len(), 1);
    assert_eq!(provenance[0]["PartyID"], "F1");
}

#[test]
fn revocation_cascade() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    net.invoke(
        &cast.auditor,
        "revoke_signing_accreditation",
        &["AC1", "2025-06-01T00:00:00Z"],
    )
    .expect("auditor revokes accreditation");

    let err = net
        .invoke(
            &cast.farm,
            "certify_grapes",
            &["U1", "AC1", "2025-06-02T09:00:00Z"],
        )
        .expect_err("certification under revoked accreditation");
    assert_eq!(err.tag(), "Revoked");

    // The earlier signature stays on the unit; readers re-validate the
    // chain and interpret it as revoked-source.
    let signatures = net
        .query("grape_certification", &["U1"])
        .expect("certification query");
    assert_eq!(signatures.as_array().expect("list").len(), 1);
}

#[test]
fn transfer_monotonicity() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    net.invoke(
        &cast.farm,
        "transfer_grapes",
        &["U1", "T1", "2025-05-03T10:00:00Z"],
    )
    .expect("farm transfers to trader");

    // Custody moved at 10:00; an earlier transfer timestamp must not enter
    // the chain.
    let err = net
        .invoke(
            &cast.trader,
            "transfer_grapes",
            &["U1", "F1", "2025-05-03T09:00:00Z"],
        )
        .expect_err("backdated transfer");
    assert_eq!(err.tag(), "BadState");

    // The farm is no longer the custodian.
    let err = net
        .invoke(
            &cast.farm,
            "transfer_grapes",
            &["U1", "T1", "2025-05-04T00:00:00Z"],
        )
        .expect_err("stale custodian");
    assert_eq!(err.tag(), "Unauthorized");

    let provenance = net
        .query("grape_provenance", &["U1"])
        .expect("provenance query");
    let provenance = provenance.as_array().expect("list");
    assert_eq!(provenance.len(), 2);
    assert_eq!(provenance[1]["PartyID"], "T1");
}

#[test]
fn expired_accreditation_blocks_issue() {
    let (net, cast) = cast();
    net.invoke(
        &cast.ab,
        "add_signing_accreditation",
        &[
            "AC1",
            "organic",
            "2024-01-01T00:00:00Z",
            "2025-01-01T00:00:00Z",
        ],
    )
    .expect("add accreditation with past expiry");

    let err = net
        .invoke(&cast.ab, "issue_signing_accreditation", &["AC1", "CB1"])
        .expect_err("issuing an expired accreditation");
    assert_eq!(err.tag(), "Expired");
}

#[test]
fn expired_accreditation_blocks_certification() {
    let (net, cast) = cast();
    // World-state predating this transaction: an accreditation that was
    // issued and delegated while live, but whose expiry has since passed.
    net.host
        .put_state(
            "SigningCertificates",
            serde_json::to_vec(&json!([{
                "ID": "AC1",
                "Description": "organic",
                "AccreditationBody": "AB1",
                "CertificationBody": "CB1",
                "Created": "2024-01-01T00:00:00Z",
                "Expires": "2025-01-01T00:00:00Z",
                "Revoked": false,
                "RevocationTimestamp": null
            }]))
            .expect("encode"),
        )
        .expect("seed accreditations");
    net.host
        .put_state(
            "SigningAuthorizations",
            serde_json::to_vec(&json!([{
                "AuthorizedParty": "F1",
                "CertificateID": "AC1",
                "Expires": "2999-01-01T00:00:00Z",
                "Revoked": false,
                "RevocationTimestamp": null
            }]))
            .expect("encode"),
        )
        .expect("seed authorizations");

    net.invoke(&cast.farm, "create_grapes", &["U1", "2025-05-01T12:00:00Z"])
        .expect("create grapes");
    let err = net
        .invoke(
            &cast.farm,
            "certify_grapes",
            &["U1", "AC1", "2025-05-02T09:00:00Z"],
        )
        .expect_err("accreditation expired before certification");
    assert_eq!(err.tag(), "Expired");
}

#[test]
fn expired_authorization_blocks_certification() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    // Overwrite the delegation with one whose expiry has passed; the
    // accreditation itself stays live.
    net.host
        .put_state(
            "SigningAuthorizations",
            serde_json::to_vec(&json!([{
                "AuthorizedParty": "F1",
                "CertificateID": "AC1",
                "Expires": "2025-06-01T00:00:00Z",
                "Revoked": false,
                "RevocationTimestamp": null
            }]))
            .expect("encode"),
        )
        .expect("seed authorizations");

    let err = net
        .invoke(
            &cast.farm,
            "certify_grapes",
            &["U1", "AC1", "2025-06-02T09:00:00Z"],
        )
        .expect_err("authorization expired");
    assert_eq!(err.tag(), "Expired");
}

#[test]
fn unknown_caller_is_rejected() {
    let (net, _cast) = cast();
    let stranger = Actor::new();

    let err = net
        .invoke(&stranger, "create_grapes", &["U1", "2025-05-01T12:00:00Z"])
        .expect_err("unregistered key");
    assert_eq!(err.tag(), "UnknownCaller");
}

#[test]
fn duplicate_party_id_is_rejected() {
    let (net, cast) = cast();

    let err = net
        .invoke(
            &cast.admin,
            "add_party",
            &["F1", "Farm", &Actor::new().cert],
        )
        .expect_err("reused party id");
    assert_eq!(err.tag(), "Duplicate");

    // The stored party list still holds exactly the original cast.
    let blob = net.host.get_state("parties").expect("read parties");
    let parties: serde_json::Value = serde_json::from_slice(&blob).expect("parse parties");
    let ids: Vec<&str> = parties
        .as_array()
        .expect("list")
        .iter()
        .map(|p| p["ID"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["AB1", "CB1", "F1", "AU1", "T1"]);
}

#[test]
fn signer_certs_lists_revoked_authorities() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    net.invoke(
        &cast.cb,
        "revoke_signing_authority",
        &["AC1", "F1", "2025-06-01T00:00:00Z"],
    )
    .expect("revoke authority");

    let authorizations = net.query("signer_certs", &["F1"]).expect("signer query");
    let authorizations = authorizations.as_array().expect("list");
    assert_eq!(authorizations.len(), 1);
    assert_eq!(authorizations[0]["CertificateID"], "AC1");
    assert_eq!(authorizations[0]["Revoked"], true);
    assert_eq!(
        authorizations[0]["RevocationTimestamp"],
        "2025-06-01T00:00:00Z"
    );
}

#[test]
fn revoked_signature_surfaces_in_certification_query() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    net.invoke(
        &cast.auditor,
        "revoke_signature",
        &["U1", "AC1", "2025-06-01T00:00:00Z"],
    )
    .expect("auditor revokes signature");

    let signatures = net
        .query("grape_certification", &["U1"])
        .expect("certification query");
    let signatures = signatures.as_array().expect("list");
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0]["Revoked"], true);
}

#[test]
fn added_cert_authenticates_as_same_party() {
    let (net, cast) = cast();

    let second_key = Actor::new();
    net.invoke(&cast.farm, "add_cert", &[&second_key.cert])
        .expect("self-service cert add");

    // The new key can now act as F1.
    net.invoke(
        &second_key,
        "create_grapes",
        &["U1", "2025-05-01T12:00:00Z"],
    )
    .expect("create grapes with the added key");

    let provenance = net
        .query("grape_provenance", &["U1"])
        .expect("provenance query");
    assert_eq!(provenance.as_array().expect("list")[0]["PartyID"], "F1");
}

#[test]
fn second_admin_can_register_parties() {
    let (net, cast) = cast();

    let second_admin = Actor::new();
    net.invoke(&cast.admin, "add_admin", &[&second_admin.cert])
        .expect("add admin");

    net.register(&second_admin, "F2", "Farm", &Actor::new());
}

#[test]
fn persisted_records_use_wire_field_names() {
    let (net, cast) = cast();
    certify_u1(&net, &cast);

    let blob = net.host.get_state("GrapeUnits").expect("read units");
    let units: serde_json::Value = serde_json::from_slice(&blob).expect("parse units");
    let unit = &units.as_array().expect("list")[0];

    assert_eq!(unit["UUID"], "U1");
    assert_eq!(unit["Producer"], "F1");
    assert_eq!(unit["Created"], "2025-05-01T12:00:00Z");
    assert_eq!(unit["CertificateSignatures"][0]["Issuer"], "F1");
    assert_eq!(unit["CertificateSignatures"][0]["Issued"], "2025-05-02T09:00:00Z");
    assert_eq!(unit["Provenance"][0]["PartyID"], "F1");
    assert_eq!(unit["Provenance"][0]["Timestamp"], "2025-05-01T12:00:00Z");
}
