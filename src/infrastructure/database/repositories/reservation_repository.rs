//! SeaORM implementation of ReservationRepository
//!
//! Every write opens its own transaction. The spot row is selected with
//! `FOR UPDATE` before the overlap scan so concurrent writers against the
//! same spot queue behind each other on backends with row locks.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use tracing::debug;

use crate::domain::reservation::{
    NewReservation, Reservation, ReservationChanges, ReservationRepository, ReservationStatus,
    TimeRange,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{parking_spot, reservation};

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let status = m.status.parse::<ReservationStatus>().map_err(|_| {
        DomainError::Internal(format!(
            "Reservation {} has unknown status '{}'",
            m.id, m.status
        ))
    })?;
    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        spot_id: m.parking_spot_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status,
        total_price: m.total_price,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn models_to_domain(models: Vec<reservation::Model>) -> DomainResult<Vec<Reservation>> {
    models.into_iter().map(model_to_domain).collect()
}

fn live_statuses() -> impl Iterator<Item = &'static str> {
    ReservationStatus::LIVE.iter().map(|s| s.as_str())
}

// ── Transaction steps ───────────────────────────────────────────

fn spot_lock_query(spot_id: i32) -> Select<parking_spot::Entity> {
    parking_spot::Entity::find_by_id(spot_id).lock_exclusive()
}

/// `SELECT ... FOR UPDATE` on the spot row
pub(super) async fn lock_spot<C: ConnectionTrait>(
    conn: &C,
    spot_id: i32,
) -> DomainResult<parking_spot::Model> {
    spot_lock_query(spot_id)
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("ParkingSpot", spot_id))
}

/// Live reservations on the spot overlapping `range`. Plain read under the
/// spot row lock: reservation rows are only ever locked before spot rows.
fn conflict_query(
    spot_id: i32,
    range: &TimeRange,
    exclude_id: Option<i32>,
) -> Select<reservation::Entity> {
    let mut query = reservation::Entity::find()
        .filter(reservation::Column::ParkingSpotId.eq(spot_id))
        .filter(reservation::Column::Status.is_in(live_statuses()))
        .filter(reservation::Column::StartTime.lt(range.end))
        .filter(reservation::Column::EndTime.gt(range.start));
    if let Some(id) = exclude_id {
        query = query.filter(reservation::Column::Id.ne(id));
    }
    query.order_by_asc(reservation::Column::StartTime)
}

/// First live reservation on the spot overlapping `range`
async fn find_conflict<C: ConnectionTrait>(
    conn: &C,
    spot_id: i32,
    range: &TimeRange,
    exclude_id: Option<i32>,
) -> DomainResult<Option<reservation::Model>> {
    Ok(conflict_query(spot_id, range, exclude_id).one(conn).await?)
}

/// Recompute the spot's `is_occupied` flag from active reservations covering `now`.
pub(super) async fn refresh_spot_occupancy<C: ConnectionTrait>(
    conn: &C,
    spot_id: i32,
    now: DateTime<Utc>,
) -> DomainResult<bool> {
    let covering = reservation::Entity::find()
        .filter(reservation::Column::ParkingSpotId.eq(spot_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
        .filter(reservation::Column::StartTime.lte(now))
        .filter(reservation::Column::EndTime.gt(now))
        .count(conn)
        .await?;
    let occupied = covering > 0;

    parking_spot::Entity::update_many()
        .col_expr(parking_spot::Column::IsOccupied, Expr::value(occupied))
        .filter(parking_spot::Column::Id.eq(spot_id))
        .exec(conn)
        .await?;
    Ok(occupied)
}

/// Move every `from` row matching `due` to `to`, then resync the touched spots.
async fn transition_due(
    db: &DatabaseConnection,
    from: ReservationStatus,
    to: ReservationStatus,
    due: sea_orm::Condition,
    now: DateTime<Utc>,
) -> DomainResult<Vec<Reservation>> {
    let txn = db.begin().await?;

    let candidates = reservation::Entity::find()
        .filter(reservation::Column::Status.eq(from.as_str()))
        .filter(due)
        .lock_exclusive()
        .all(&txn)
        .await?;
    if candidates.is_empty() {
        txn.commit().await?;
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = candidates.iter().map(|m| m.id).collect();
    let result = reservation::Entity::update_many()
        .col_expr(reservation::Column::Status, Expr::value(to.as_str()))
        .col_expr(reservation::Column::UpdatedAt, Expr::value(now))
        .filter(reservation::Column::Id.is_in(ids.clone()))
        .filter(reservation::Column::Status.eq(from.as_str()))
        .exec(&txn)
        .await?;

    let moved = reservation::Entity::find()
        .filter(reservation::Column::Id.is_in(ids))
        .filter(reservation::Column::Status.eq(to.as_str()))
        .order_by_asc(reservation::Column::Id)
        .all(&txn)
        .await?;

    let spots: BTreeSet<i32> = moved.iter().map(|m| m.parking_spot_id).collect();
    for spot_id in spots {
        refresh_spot_occupancy(&txn, spot_id, now).await?;
    }

    txn.commit().await?;
    debug!(
        from = %from,
        to = %to,
        rows = result.rows_affected,
        "Lifecycle transition applied"
    );
    models_to_domain(moved)
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::StartTime)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn find_live(&self) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.is_in(live_statuses()))
            .order_by_asc(reservation::Column::ParkingSpotId)
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn create_exclusive(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        debug!(
            spot_id = new.spot_id,
            user_id = new.user_id,
            start = %new.range.start,
            end = %new.range.end,
            "Creating reservation"
        );

        let txn = self.db.begin().await?;
        let spot = lock_spot(&txn, new.spot_id).await?;

        if let Some(conflict) = find_conflict(&txn, new.spot_id, &new.range, None).await? {
            txn.rollback().await?;
            return Err(DomainError::SpotUnavailable {
                spot_id: new.spot_id,
                conflicting_id: conflict.id,
            });
        }

        let model = reservation::ActiveModel {
            user_id: Set(new.user_id),
            vehicle_id: Set(new.vehicle_id),
            parking_spot_id: Set(new.spot_id),
            start_time: Set(new.range.start),
            end_time: Set(new.range.end),
            status: Set(ReservationStatus::Pending.as_str().to_string()),
            total_price: Set(new.range.price(spot.price_per_hour)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        debug!("Reservation {} committed on spot {}", model.id, model.parking_spot_id);
        model_to_domain(model)
    }

    async fn update_exclusive(
        &self,
        id: i32,
        changes: ReservationChanges,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        debug!("Updating reservation: {}", id);

        let txn = self.db.begin().await?;
        let existing = reservation::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        let spot = lock_spot(&txn, existing.parking_spot_id).await?;

        let current = model_to_domain(existing.clone())?;
        let plan = current.plan_update(&changes, now)?;

        if plan.reschedule && plan.status.is_live() {
            if let Some(conflict) = find_conflict(&txn, spot.id, &plan.range, Some(id)).await? {
                txn.rollback().await?;
                return Err(DomainError::SpotUnavailable {
                    spot_id: spot.id,
                    conflicting_id: conflict.id,
                });
            }
        }

        let mut active: reservation::ActiveModel = existing.into();
        if plan.reschedule {
            active.start_time = Set(plan.range.start);
            active.end_time = Set(plan.range.end);
            active.total_price = Set(plan.range.price(spot.price_per_hour));
        }
        if plan.status != current.status {
            active.status = Set(plan.status.as_str().to_string());
        }
        active.updated_at = Set(now);
        let model = active.update(&txn).await?;

        refresh_spot_occupancy(&txn, spot.id, now).await?;
        txn.commit().await?;
        model_to_domain(model)
    }

    async fn cancel(&self, id: i32, now: DateTime<Utc>) -> DomainResult<Reservation> {
        debug!("Cancelling reservation: {}", id);

        let txn = self.db.begin().await?;
        let existing = reservation::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        let current = model_to_domain(existing.clone())?;

        if current.status == ReservationStatus::Cancelled {
            txn.commit().await?;
            return Ok(current);
        }
        current.status.ensure_transition(ReservationStatus::Cancelled)?;

        let mut active: reservation::ActiveModel = existing.into();
        active.status = Set(ReservationStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(now);
        let model = active.update(&txn).await?;

        if current.status == ReservationStatus::Active {
            refresh_spot_occupancy(&txn, current.spot_id, now).await?;
        }
        txn.commit().await?;
        model_to_domain(model)
    }

    async fn activate_due(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        transition_due(
            &self.db,
            ReservationStatus::Pending,
            ReservationStatus::Active,
            sea_orm::Condition::all().add(reservation::Column::StartTime.lte(now)),
            now,
        )
        .await
    }

    async fn complete_due(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        transition_due(
            &self.db,
            ReservationStatus::Active,
            ReservationStatus::Completed,
            sea_orm::Condition::all().add(reservation::Column::EndTime.lte(now)),
            now,
        )
        .await
    }
}
