//! In-memory storage backend
//!
//! Enforces the same uniqueness and foreign-key constraints as the Postgres
//! schema, with per-call copy-commit semantics so a failed bulk insert
//! leaves no partial state behind. Used by the test suite and by dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    DeliveryRow, EntityKind, InningsRow, MatchRow, ScoresheetRow, Store, StoreError, WicketRow,
};

#[derive(Default)]
struct Tables {
    entities: HashMap<EntityKind, HashMap<String, i64>>,
    next_entity_id: i64,
    matches: HashMap<i64, MatchRow>,
    scoresheets: HashMap<i64, ScoresheetRow>,
    innings: Vec<(i64, InningsRow)>,
    next_innings_id: i64,
    deliveries: Vec<(i64, DeliveryRow)>,
    next_delivery_id: i64,
    wickets: Vec<WicketRow>,
}

impl Tables {
    fn innings_id(&self, match_id: i64, innings_number: &str) -> Option<i64> {
        self.innings
            .iter()
            .find(|(_, row)| row.match_id == match_id && row.innings_number == innings_number)
            .map(|(id, _)| *id)
    }
}

/// In-memory [`Store`] with the relational constraints of the real schema
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in one lookup-entity table
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        let tables = self.inner.lock().unwrap();
        tables.entities.get(&kind).map_or(0, |t| t.len())
    }

    /// Resolved id for a name, if that entity row exists
    pub fn entity_id(&self, kind: EntityKind, name: &str) -> Option<i64> {
        let tables = self.inner.lock().unwrap();
        tables.entities.get(&kind).and_then(|t| t.get(name)).copied()
    }

    pub fn match_rows(&self) -> Vec<MatchRow> {
        self.inner.lock().unwrap().matches.values().cloned().collect()
    }

    pub fn scoresheet_rows(&self) -> Vec<ScoresheetRow> {
        self.inner.lock().unwrap().scoresheets.values().cloned().collect()
    }

    pub fn innings_rows(&self) -> Vec<InningsRow> {
        self.inner
            .lock()
            .unwrap()
            .innings
            .iter()
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn delivery_rows(&self) -> Vec<DeliveryRow> {
        self.inner
            .lock()
            .unwrap()
            .deliveries
            .iter()
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn wicket_rows(&self) -> Vec<WicketRow> {
        self.inner.lock().unwrap().wickets.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<i64>, StoreError> {
        let tables = self.inner.lock().unwrap();
        Ok(tables.entities.get(&kind).and_then(|t| t.get(name)).copied())
    }

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<i64, StoreError> {
        let mut tables = self.inner.lock().unwrap();
        if tables.entities.entry(kind).or_default().contains_key(name) {
            return Err(StoreError::UniqueViolation(format!(
                "{}.name = {:?}",
                kind.table(),
                name
            )));
        }
        tables.next_entity_id += 1;
        let id = tables.next_entity_id;
        tables
            .entities
            .entry(kind)
            .or_default()
            .insert(name.to_string(), id);
        Ok(id)
    }

    async fn insert_matches(
        &self,
        matches: &[MatchRow],
        scoresheets: &[ScoresheetRow],
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();

        // Validate the whole batch before touching the tables, so a failure
        // behaves like a rolled-back transaction.
        for m in matches {
            if tables.matches.contains_key(&m.id) {
                return Err(StoreError::UniqueViolation(format!("matches.id = {}", m.id)));
            }
        }
        for s in scoresheets {
            let match_known = tables.matches.contains_key(&s.match_id)
                || matches.iter().any(|m| m.id == s.match_id);
            if !match_known {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "scoresheets.match_id = {}",
                    s.match_id
                )));
            }
        }

        for m in matches {
            tables.matches.insert(m.id, m.clone());
        }
        for s in scoresheets {
            tables.scoresheets.insert(s.match_id, s.clone());
        }
        Ok(())
    }

    async fn match_exists(&self, match_id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().matches.contains_key(&match_id))
    }

    async fn insert_innings(&self, rows: &[InningsRow]) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();

        for row in rows {
            if !tables.matches.contains_key(&row.match_id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "innings.match_id = {}",
                    row.match_id
                )));
            }
            if tables.innings_id(row.match_id, &row.innings_number).is_some() {
                return Err(StoreError::UniqueViolation(format!(
                    "innings ({}, {:?})",
                    row.match_id, row.innings_number
                )));
            }
        }

        for row in rows {
            tables.next_innings_id += 1;
            let id = tables.next_innings_id;
            tables.innings.push((id, row.clone()));
        }
        Ok(())
    }

    async fn find_innings(
        &self,
        match_id: i64,
        innings_number: &str,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self.inner.lock().unwrap().innings_id(match_id, innings_number))
    }

    async fn insert_delivery(
        &self,
        delivery: &DeliveryRow,
        wickets: &[WicketRow],
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();

        if !tables.innings.iter().any(|(id, _)| *id == delivery.innings_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "deliveries.innings_id = {}",
                delivery.innings_id
            )));
        }
        let duplicate = tables.deliveries.iter().any(|(_, d)| {
            d.match_id == delivery.match_id
                && d.innings_id == delivery.innings_id
                && d.over_number == delivery.over_number
                && d.ball_number == delivery.ball_number
        });
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "deliveries ({}, {}, {}.{})",
                delivery.match_id, delivery.innings_id, delivery.over_number, delivery.ball_number
            )));
        }

        tables.next_delivery_id += 1;
        let id = tables.next_delivery_id;
        tables.deliveries.push((id, delivery.clone()));
        tables.wickets.extend(wickets.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn innings_row(match_id: i64, number: &str) -> InningsRow {
        InningsRow {
            match_id,
            innings_number: number.to_string(),
            batting_team: 1,
            penalty_runs_pre: None,
            penalty_runs_post: None,
            was_declared: false,
        }
    }

    #[tokio::test]
    async fn test_entity_insert_is_unique() {
        let store = MemoryStore::new();
        let id = store.insert_entity(EntityKind::Team, "India").await.unwrap();
        let err = store.insert_entity(EntityKind::Team, "India").await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(store.find_entity(EntityKind::Team, "India").await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn test_same_name_different_kinds_do_not_collide() {
        let store = MemoryStore::new();
        let team = store.insert_entity(EntityKind::Team, "Smith").await.unwrap();
        let player = store.insert_entity(EntityKind::Player, "Smith").await.unwrap();
        assert_ne!(team, player);
    }

    #[tokio::test]
    async fn test_innings_rejects_unknown_match() {
        let store = MemoryStore::new();
        let err = store.insert_innings(&[innings_row(99, "1st innings")]).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        assert!(store.innings_rows().is_empty());
    }
}
