//! Typed collection store over the host key-value ledger.
//!
//! Every collection is persisted as one JSON array under a fixed key. The
//! host offers only per-key atomic puts, so mutations follow the pattern
//! *load whole collection, validate, mutate, save whole collection*; the
//! host's end-of-transaction commit makes that coarse scheme correct.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ChainError, ChainResult};
use crate::host::LedgerHost;

/// Key of the admin certificate list.
pub const ADMIN_CERTS_KEY: &str = "AdminCerts";

/// Key of the registered party list.
pub const PARTIES_KEY: &str = "parties";

/// Key of the signing accreditation list.
///
/// The persisted name predates the accreditation terminology and is kept for
/// compatibility with existing world-state.
pub const ACCREDITATIONS_KEY: &str = "SigningCertificates";

/// Key of the signing authorization list.
pub const AUTHORIZATIONS_KEY: &str = "SigningAuthorizations";

/// Key of the grape unit list.
pub const GRAPE_UNITS_KEY: &str = "GrapeUnits";

/// Typed wrapper over the host KV for whole-collection reads and writes.
#[derive(Clone, Copy)]
pub struct Store<'a> {
    host: &'a dyn LedgerHost,
}

impl<'a> Store<'a> {
    /// Creates a store bound to the current transaction's host context.
    #[must_use]
    pub fn new(host: &'a dyn LedgerHost) -> Self {
        Self { host }
    }

    /// Seeds the world-state: empty collections plus one bootstrap admin
    /// certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Encode`] or [`ChainError::StoreWrite`] if a
    /// collection cannot be written.
    pub fn init(&self, admin_cert: &str) -> ChainResult<()> {
        self.save::<String>(PARTIES_KEY, &[])?;
        self.save::<String>(ACCREDITATIONS_KEY, &[])?;
        self.save::<String>(AUTHORIZATIONS_KEY, &[])?;
        self.save::<String>(GRAPE_UNITS_KEY, &[])?;
        self.save(ADMIN_CERTS_KEY, &[admin_cert.to_string()])
    }

    /// Loads the collection stored under `key`.
    ///
    /// An empty blob (including a key never written) parses as the empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::StoreRead`] on a host read failure and
    /// [`ChainError::Decode`] on a malformed blob.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> ChainResult<Vec<T>> {
        let blob = self.host.get_state(key)?;
        if blob.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&blob).map_err(|_| ChainError::Decode {
            key: key.to_string(),
        })
    }

    /// Saves `items` as the complete collection under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Encode`] on a serialization failure and
    /// [`ChainError::StoreWrite`] on a host write failure.
    pub fn save<T: Serialize>(&self, key: &str, items: &[T]) -> ChainResult<()> {
        let blob = serde_json::to_vec(items).map_err(|_| ChainError::Encode {
            key: key.to_string(),
        })?;
        self.host.put_state(key, blob)
    }

    /// Appends `item` to the collection, rejecting key collisions.
    ///
    /// `keyof` projects the uniqueness key out of an item; `entity` names the
    /// record kind in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Duplicate`] if another item with the same key is
    /// already present, plus any load/save error.
    pub fn insert_unique<T>(
        &self,
        key: &str,
        item: T,
        entity: &'static str,
        keyof: impl Fn(&T) -> String,
    ) -> ChainResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut items: Vec<T> = self.load(key)?;
        let item_key = keyof(&item);
        if items.iter().any(|existing| keyof(existing) == item_key) {
            return Err(ChainError::Duplicate {
                entity,
                id: item_key,
            });
        }
        items.push(item);
        self.save(key, &items)
    }

    /// Replaces the first collection entry matched by `matches` with `item`.
    ///
    /// A missing match is a silent no-op, not an error; callers that require
    /// the entry to exist must check separately before updating.
    ///
    /// # Errors
    ///
    /// Propagates load/save errors.
    pub fn update_by<T>(
        &self,
        key: &str,
        item: T,
        matches: impl Fn(&T) -> bool,
    ) -> ChainResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut items: Vec<T> = self.load(key)?;
        if let Some(slot) = items.iter_mut().find(|existing| matches(existing)) {
            *slot = item;
        }
        self.save(key, &items)
    }
}
