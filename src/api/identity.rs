//! Caller identity resolution.
//!
//! Every effectful operation runs on behalf of an explicit caller; there
//! is no ambient session. UI screens send the acting member's id in the
//! `X-Member-Id` header and the extractor resolves it against the store,
//! so handlers receive a verified [`Caller`] value they can pass down.

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::db::Store;
use crate::error::Error;

pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// The member a request acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub member_id: Uuid,
    pub is_admin: bool,
}

impl Caller {
    /// Guard for admin-only operations.
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin {
            Ok(())
        } else {
            Err(Error::Forbidden("this action requires an admin"))
        }
    }
}

fn resolve(store: &Store, parts: &Parts) -> Result<Option<Caller>, Error> {
    let Some(raw) = parts.headers.get(MEMBER_ID_HEADER) else {
        return Ok(None);
    };

    let id = raw
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or(Error::Unauthorized)?;

    let member = store.get_member(id)?.ok_or(Error::Unauthorized)?;
    Ok(Some(Caller {
        member_id: member.id,
        is_admin: member.is_admin,
    }))
}

impl<S> FromRequestParts<S> for Caller
where
    Store: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Store::from_ref(state);
        resolve(&store, parts)?.ok_or(Error::Unauthorized)
    }
}

/// Read endpoints accept an anonymous viewer; a present but unknown
/// identity is still rejected rather than silently downgraded.
impl<S> OptionalFromRequestParts<S> for Caller
where
    Store: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let store = Store::from_ref(state);
        resolve(&store, parts)
    }
}
