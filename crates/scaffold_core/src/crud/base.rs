//! Generic CRUD primitives parameterized by entity and input shapes.
//!
//! # Responsibility
//! - Serve get/list/create/update/delete for any [`Entity`].
//! - Offer flush-only variants so several repositories can share one
//!   transaction and commit once at the call site.
//!
//! # Invariants
//! - `CrudBase` holds no per-request state.
//! - Transactions are only advanced through `Session::flush`/`commit`.
//! - Update never rewrites the primary key.

use crate::crud::entity::{
    decode_entity, encode_fields, primary_key_of, with_primary_key, Entity, EntityId, FieldMap,
};
use crate::session::{Session, SessionError, SessionResult};
use log::debug;
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

pub const DEFAULT_SKIP: u64 = 0;
pub const DEFAULT_LIMIT: u64 = 100;

/// Update payload: a partial shape or a raw field mapping.
///
/// Shapes contribute only the fields they serialize. Optional shape fields
/// should carry `#[serde(skip_serializing_if = "Option::is_none")]` so that
/// unset fields stay untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateInput<U> {
    Shape(U),
    Fields(FieldMap),
}

impl<U: Serialize> UpdateInput<U> {
    /// Field names and values this update will write.
    pub fn into_fields(self) -> SessionResult<FieldMap> {
        match self {
            Self::Shape(shape) => encode_fields(&shape),
            Self::Fields(fields) => Ok(fields),
        }
    }
}

impl<U> From<FieldMap> for UpdateInput<U> {
    fn from(value: FieldMap) -> Self {
        Self::Fields(value)
    }
}

/// CRUD object with default methods to create, read, update and delete `E`.
///
/// `C` is the create shape, `U` the partial update shape.
pub struct CrudBase<E, C, U> {
    _types: PhantomData<fn() -> (E, C, U)>,
}

impl<E, C, U> CrudBase<E, C, U> {
    pub const fn new() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

impl<E, C, U> Default for CrudBase<E, C, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, C, U> Clone for CrudBase<E, C, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, C, U> Copy for CrudBase<E, C, U> {}

impl<E: Entity, C, U> Debug for CrudBase<E, C, U> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudBase").field("table", &E::TABLE).finish()
    }
}

impl<E, C, U> CrudBase<E, C, U>
where
    E: Entity,
    C: Serialize,
    U: Serialize,
{
    /// Looks a record up by its single-column primary key.
    pub fn get(&self, session: &mut Session<'_>, id: EntityId) -> SessionResult<Option<E>> {
        debug!("event=crud_get module=crud table={} id={id}", E::TABLE);
        session.query::<E>().get(id)
    }

    /// Returns one page of records in backend order.
    pub fn get_multi(
        &self,
        session: &mut Session<'_>,
        skip: u64,
        limit: u64,
    ) -> SessionResult<Vec<E>> {
        debug!(
            "event=crud_get_multi module=crud table={} skip={skip} limit={limit}",
            E::TABLE
        );
        session.query::<E>().offset(skip).limit(limit).all()
    }

    /// `get_multi` with skip 0 and limit 100.
    pub fn get_multi_default(&self, session: &mut Session<'_>) -> SessionResult<Vec<E>> {
        self.get_multi(session, DEFAULT_SKIP, DEFAULT_LIMIT)
    }

    /// Same as [`CrudBase::create_flush`], but commits and refreshes.
    pub fn create(&self, session: &mut Session<'_>, obj_in: &C) -> SessionResult<E> {
        let mut db_obj = self.create_flush(session, obj_in)?;
        session.commit()?;
        session.refresh(&mut db_obj)?;
        Ok(db_obj)
    }

    /// Inserts a new record and flushes without committing.
    ///
    /// The returned record carries its generated primary key. Use it to
    /// create records of several entities and commit them together.
    pub fn create_flush(&self, session: &mut Session<'_>, obj_in: &C) -> SessionResult<E> {
        let obj_in_data = encode_fields(obj_in)?;
        let db_obj: E = decode_entity(obj_in_data)?;
        let ticket = session.add(&db_obj)?;
        let summary = session.flush()?;
        let id = summary
            .generated_key(ticket)
            .ok_or(SessionError::MissingPrimaryKey { table: E::TABLE })?;
        debug!("event=crud_create module=crud table={} id={id}", E::TABLE);
        with_primary_key(db_obj, id)
    }

    /// Overwrites fields of `db_obj` present in `obj_in`, commits and
    /// refreshes.
    ///
    /// Only the overwritten columns are written; every other column keeps
    /// its stored value even if `db_obj` is out of date.
    pub fn update(
        &self,
        session: &mut Session<'_>,
        db_obj: E,
        obj_in: UpdateInput<U>,
    ) -> SessionResult<E> {
        let mut db_obj = self.update_flush(session, db_obj, obj_in)?;
        session.commit()?;
        session.refresh(&mut db_obj)?;
        Ok(db_obj)
    }

    /// Same as [`CrudBase::update`], but only flushes.
    pub fn update_flush(
        &self,
        session: &mut Session<'_>,
        db_obj: E,
        obj_in: UpdateInput<U>,
    ) -> SessionResult<E> {
        let id = primary_key_of(&db_obj)?
            .ok_or(SessionError::MissingPrimaryKey { table: E::TABLE })?;
        let (db_obj, changes) = apply_update(db_obj, obj_in)?;
        let changed = changes.len();
        if changed > 0 {
            session.update_fields::<E>(id, changes);
        }
        session.flush()?;
        debug!(
            "event=crud_update module=crud table={} id={id} fields={changed}",
            E::TABLE
        );
        Ok(db_obj)
    }

    /// Same as [`CrudBase::remove_flush`], but commits.
    pub fn remove(&self, session: &mut Session<'_>, id: EntityId) -> SessionResult<E> {
        let obj = self.remove_flush(session, id)?;
        session.commit()?;
        Ok(obj)
    }

    /// Deletes a record by primary key and flushes without committing.
    ///
    /// Mind foreign keys between entities when deleting across several
    /// repositories in one transaction. A missing id fails with
    /// [`SessionError::RecordNotFound`].
    pub fn remove_flush(&self, session: &mut Session<'_>, id: EntityId) -> SessionResult<E> {
        let obj = session
            .query::<E>()
            .get(id)?
            .ok_or(SessionError::RecordNotFound { table: E::TABLE, id })?;
        session.delete(&obj)?;
        session.flush()?;
        debug!("event=crud_remove module=crud table={} id={id}", E::TABLE);
        Ok(obj)
    }
}

/// Copies every update value whose key names an existing entity field and
/// returns the patched record with the fields that were written.
/// Unknown keys and the primary key are ignored.
fn apply_update<E: Entity, U: Serialize>(
    db_obj: E,
    obj_in: UpdateInput<U>,
) -> SessionResult<(E, FieldMap)> {
    let mut obj_data = encode_fields(&db_obj)?;
    let mut changes = FieldMap::new();
    for (field, new_value) in obj_in.into_fields()? {
        if field == E::PRIMARY_KEY {
            continue;
        }
        if let Some(value) = obj_data.get_mut(&field) {
            value.clone_from(&new_value);
            changes.insert(field, new_value);
        }
    }
    Ok((decode_entity(obj_data)?, changes))
}

#[cfg(test)]
mod tests {
    use super::{apply_update, UpdateInput};
    use crate::crud::entity::{Column, ColumnKind, Entity};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        #[serde(default)]
        id: Option<i64>,
        label: String,
        qty: i64,
    }

    impl Entity for Item {
        const TABLE: &'static str = "items";
        const COLUMNS: &'static [Column] = &[
            Column::new("id", ColumnKind::Integer),
            Column::new("label", ColumnKind::Text),
            Column::new("qty", ColumnKind::Integer),
        ];
    }

    #[derive(Debug, Serialize)]
    struct ItemUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        qty: Option<i64>,
    }

    fn item() -> Item {
        Item {
            id: Some(3),
            label: "bolt".to_string(),
            qty: 10,
        }
    }

    #[test]
    fn shape_update_touches_only_set_fields() {
        let (updated, changes) = apply_update(
            item(),
            UpdateInput::Shape(ItemUpdate {
                label: None,
                qty: Some(4),
            }),
        )
        .expect("shape update should apply");
        assert_eq!(updated.label, "bolt");
        assert_eq!(updated.qty, 4);
        assert_eq!(changes.keys().collect::<Vec<_>>(), vec!["qty"]);
    }

    #[test]
    fn mapping_update_ignores_unknown_keys_and_primary_key() {
        let fields = json!({"label": "nut", "colour": "red", "id": 99})
            .as_object()
            .cloned()
            .expect("literal should be an object");
        let (updated, changes) = apply_update::<Item, ItemUpdate>(item(), UpdateInput::Fields(fields))
            .expect("mapping update should apply");
        assert_eq!(updated.id, Some(3));
        assert_eq!(updated.label, "nut");
        assert_eq!(updated.qty, 10);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("label"), Some(&json!("nut")));
    }
}
