//! Entity resolver
//!
//! Get-or-create service for the four deduplicated lookup-entity kinds.
//! Each distinct `(kind, name)` resolves to exactly one id for the lifetime
//! of the store: first within the run via a local cache, then via a unique
//! lookup, and only then by inserting a new row.
//!
//! The resolver does not special-case empty or absent names; callers decide
//! whether an absent optional reference means "no reference" and skip
//! resolution accordingly.

use std::collections::HashMap;

use cricdb_common::{IngestError, Result};
use tracing::debug;

use crate::store::{EntityKind, Store, StoreError};

/// Run-scoped name→id resolution cache over a [`Store`]
pub struct EntityResolver<'a> {
    store: &'a dyn Store,
    cache: HashMap<(EntityKind, String), i64>,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Resolve a name to its canonical id, creating the row on first use
    ///
    /// Idempotent: repeated calls with the same `(kind, name)` return the
    /// same id, within a run and across runs against a persisted store.
    pub async fn resolve(&mut self, kind: EntityKind, name: &str) -> Result<i64> {
        if let Some(id) = self.cache.get(&(kind, name.to_string())) {
            return Ok(*id);
        }

        let id = match self.store.find_entity(kind, name).await.map_err(IngestError::from)? {
            Some(id) => id,
            None => match self.store.insert_entity(kind, name).await {
                Ok(id) => {
                    debug!(kind = kind.as_str(), name, id, "created lookup entity");
                    id
                },
                // Lost the check-then-create race: another writer inserted
                // this name first, so the row exists now.
                Err(StoreError::UniqueViolation(_)) => self
                    .store
                    .find_entity(kind, name)
                    .await
                    .map_err(IngestError::from)?
                    .ok_or_else(|| {
                        IngestError::Store(format!(
                            "{} {:?} missing after unique violation",
                            kind.as_str(),
                            name
                        ))
                    })?,
                Err(err) => return Err(err.into()),
            },
        };

        self.cache.insert((kind, name.to_string()), id);
        Ok(id)
    }

    /// Resolve an optional reference, leaving `None` unset
    pub async fn resolve_opt(
        &mut self,
        kind: EntityKind,
        name: Option<&str>,
    ) -> Result<Option<i64>> {
        match name {
            Some(n) => Ok(Some(self.resolve(kind, n).await?)),
            None => Ok(None),
        }
    }

    /// Resolve a required reference; an empty name is a resolution error
    pub async fn resolve_required(
        &mut self,
        kind: EntityKind,
        name: &str,
        record: &str,
    ) -> Result<i64> {
        if name.is_empty() {
            return Err(IngestError::Resolution {
                kind: kind.as_str(),
                record: record.to_string(),
                reason: "required name is empty".to_string(),
            });
        }
        self.resolve(kind, name).await
    }
}
