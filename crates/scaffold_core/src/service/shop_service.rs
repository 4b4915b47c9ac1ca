//! Shop use-case service.
//!
//! # Invariants
//! - A shop's owner must exist.
//! - Shop names are unique per owner and must not be blank.
//! - `open_with_owner` writes the owner and the shop in one transaction.

use crate::crud::EntityId;
use crate::exceptions::{DataError, KeyAttr};
use crate::model::shop::{Shop, ShopCreate, ShopCrud, SHOPS};
use crate::model::user::{User, UserCreate};
use crate::service::user_service::UserService;
use crate::service::ServiceResult;
use crate::session::Session;
use log::info;

const SUBJECT: &str = "shop";

/// Use-case service for shops.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShopService {
    crud: ShopCrud,
    users: UserService,
}

impl ShopService {
    pub fn new() -> Self {
        Self {
            crud: SHOPS,
            users: UserService::new(),
        }
    }

    /// Opens a shop for an existing owner and commits.
    pub fn open(&self, session: &mut Session<'_>, obj_in: &ShopCreate) -> ServiceResult<Shop> {
        self.users.get(session, obj_in.owner_id)?;
        self.check_shop(session, obj_in)?;
        Ok(self.crud.create(session, obj_in)?)
    }

    /// Registers a new owner and opens their first shop atomically.
    ///
    /// Both records are flushed first; the commit happens once at the end.
    /// Any failure rolls both back.
    pub fn open_with_owner(
        &self,
        session: &mut Session<'_>,
        owner_in: &UserCreate,
        shop_name: &str,
    ) -> ServiceResult<(User, Shop)> {
        let result = self.open_with_owner_flush(session, owner_in, shop_name);
        let (mut owner, mut shop) = match result {
            Ok(pair) => pair,
            Err(err) => {
                session.rollback()?;
                return Err(err);
            }
        };
        session.commit()?;
        session.refresh(&mut owner)?;
        session.refresh(&mut shop)?;
        info!(
            "event=shop_open_with_owner module=service status=ok owner_id={:?} shop_id={:?}",
            owner.id, shop.id
        );
        Ok((owner, shop))
    }

    pub fn list_for_owner(
        &self,
        session: &mut Session<'_>,
        owner_id: EntityId,
    ) -> ServiceResult<Vec<Shop>> {
        Ok(session
            .query::<Shop>()
            .filter_by("owner_id", owner_id)
            .all()?)
    }

    fn open_with_owner_flush(
        &self,
        session: &mut Session<'_>,
        owner_in: &UserCreate,
        shop_name: &str,
    ) -> ServiceResult<(User, Shop)> {
        let owner = self.users.register_flush(session, owner_in)?;
        let owner_id = owner.id.ok_or_else(|| DataError::other(SUBJECT))?;
        let shop_in = ShopCreate {
            owner_id,
            name: shop_name.to_string(),
            settings: None,
        };
        self.check_shop(session, &shop_in)?;
        let shop = self.crud.create_flush(session, &shop_in)?;
        Ok((owner, shop))
    }

    fn check_shop(&self, session: &mut Session<'_>, obj_in: &ShopCreate) -> ServiceResult<()> {
        if obj_in.name.trim().is_empty() {
            return Err(DataError::check(SUBJECT)
                .with_detail("shop name must not be blank")
                .into());
        }

        let existing = session
            .query::<Shop>()
            .filter_by("owner_id", obj_in.owner_id)
            .filter_by("name", obj_in.name.as_str())
            .first()?;
        if existing.is_some() {
            return Err(DataError::exist(
                SUBJECT,
                vec![
                    KeyAttr::new("owner_id", obj_in.owner_id),
                    KeyAttr::new("name", obj_in.name.as_str()),
                ],
            )
            .into());
        }
        Ok(())
    }
}
