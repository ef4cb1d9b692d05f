//! Who may see or change a trip.
//!
//! Owners have full access. An active share grants read access at any level
//! and write access at edit/admin. Public trips are readable by anyone who is
//! logged in. A trip the user cannot see at all behaves as absent.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        share::{PermissionLevel, TripShare},
        trip::Trip,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripAccess {
    Owner,
    Shared(PermissionLevel),
    PublicRead,
}

impl TripAccess {
    pub fn can_write(&self) -> bool {
        match self {
            TripAccess::Owner => true,
            TripAccess::Shared(level) => level.allows_write(),
            TripAccess::PublicRead => false,
        }
    }
}

pub async fn trip_access(
    db: &DbPool,
    trip: &Trip,
    user_id: i64,
) -> Result<Option<TripAccess>, AppError> {
    if trip.user_id == user_id {
        return Ok(Some(TripAccess::Owner));
    }
    if let Some(share) = TripShare::active_for(db, trip.id, user_id).await? {
        return Ok(Some(TripAccess::Shared(share.permission())));
    }
    if trip.is_public {
        return Ok(Some(TripAccess::PublicRead));
    }
    Ok(None)
}

pub async fn require_trip_read(
    db: &DbPool,
    trip_id: i64,
    user_id: i64,
) -> Result<Trip, AppError> {
    let trip = Trip::fetch(db, trip_id).await?.ok_or(AppError::NotFound)?;
    match trip_access(db, &trip, user_id).await? {
        Some(_) => Ok(trip),
        None => Err(AppError::NotFound),
    }
}

pub async fn require_trip_write(
    db: &DbPool,
    trip_id: i64,
    user_id: i64,
) -> Result<Trip, AppError> {
    let trip = Trip::fetch(db, trip_id).await?.ok_or(AppError::NotFound)?;
    match trip_access(db, &trip, user_id).await? {
        Some(access) if access.can_write() => Ok(trip),
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::NotFound),
    }
}

/// Share management is owner-only.
pub fn require_owner(trip: &Trip, user_id: i64) -> Result<(), AppError> {
    if trip.user_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_access_matrix() {
        assert!(TripAccess::Owner.can_write());
        assert!(!TripAccess::Shared(PermissionLevel::View).can_write());
        assert!(TripAccess::Shared(PermissionLevel::Edit).can_write());
        assert!(TripAccess::Shared(PermissionLevel::Admin).can_write());
        assert!(!TripAccess::PublicRead.can_write());
    }
}
