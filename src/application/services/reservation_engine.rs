//! Reservation Engine
//!
//! Validates and commits reservation writes. Every write that can change a
//! spot's claims holds that spot's [`SpotLocks`] gate for the duration of the
//! store transaction; the state-change notification goes out only after the
//! gate is released.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::spot_locks::SpotLocks;
use crate::application::ports::SharedNotifier;
use crate::domain::{
    DomainError, DomainResult, NewPayment, NewReservation, ParkingSpot, PaymentMethod,
    PaymentReceipt, RepositoryProvider, Reservation, ReservationChanges, ReservationStatus, TimeRange,
};
use crate::support::time::SharedClock;

/// Identity of the caller, as vouched for by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i32) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    fn may_act_for(&self, owner_id: i32) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub user_id: i32,
    pub vehicle_id: i32,
    pub spot_id: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct ReservationEngine {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<SpotLocks>,
    notifier: SharedNotifier,
    clock: SharedClock,
}

impl ReservationEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<SpotLocks>,
        notifier: SharedNotifier,
        clock: SharedClock,
    ) -> Self {
        Self {
            repos,
            locks,
            notifier,
            clock,
        }
    }

    /// Create a pending reservation if `[start, end)` is free on the spot.
    pub async fn create(&self, cmd: CreateReservation) -> DomainResult<Reservation> {
        let now = self.clock.now();
        let range = TimeRange::upcoming(cmd.start, cmd.end, now).inspect_err(record_rejection)?;

        let created = {
            let _gate = self.locks.acquire(cmd.spot_id).await;
            self.repos
                .reservations()
                .create_exclusive(
                    NewReservation {
                        user_id: cmd.user_id,
                        vehicle_id: cmd.vehicle_id,
                        spot_id: cmd.spot_id,
                        range,
                    },
                    now,
                )
                .await
        }
        .inspect_err(record_rejection)?;

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = created.id,
            spot_id = created.spot_id,
            user_id = created.user_id,
            total_price = created.total_price,
            "🅿️ Reservation created"
        );

        self.notifier.notify().await;
        Ok(created)
    }

    /// Edit times and/or status. Interval changes go through the same locked
    /// overlap check as creation.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        changes: ReservationChanges,
    ) -> DomainResult<Reservation> {
        if changes.start_time.is_none() && changes.end_time.is_none() && changes.status.is_none() {
            return Err(DomainError::InvalidInput("Nothing to update".into()));
        }
        let current = self.load_for(actor, id).await?;

        let updated = {
            let _gate = self.locks.acquire(current.spot_id).await;
            self.repos
                .reservations()
                .update_exclusive(id, changes, self.clock.now())
                .await
        }
        .inspect_err(record_rejection)?;

        info!(
            reservation_id = id,
            status = %updated.status,
            total_price = updated.total_price,
            "✏️ Reservation updated"
        );

        self.notifier.notify().await;
        Ok(updated)
    }

    /// Cancel a reservation owned by the actor. Cancelling twice is a no-op.
    pub async fn cancel(&self, actor: &Actor, id: i32) -> DomainResult<Reservation> {
        let current = self.load_for(actor, id).await?;
        if current.status == ReservationStatus::Cancelled {
            debug!("Reservation {} already cancelled", id);
            return Ok(current);
        }

        let cancelled = {
            let _gate = self.locks.acquire(current.spot_id).await;
            self.repos
                .reservations()
                .cancel(id, self.clock.now())
                .await?
        };

        metrics::counter!("reservations_cancelled_total").increment(1);
        info!(reservation_id = id, spot_id = cancelled.spot_id, "❌ Reservation cancelled");

        self.notifier.notify().await;
        Ok(cancelled)
    }

    /// Record a completed payment by the actor for one of their reservations.
    ///
    /// A pending reservation whose start has passed becomes active right away;
    /// otherwise activation is left to the lifecycle scheduler.
    pub async fn process_payment(
        &self,
        actor: &Actor,
        reservation_id: i32,
        amount: f64,
        method: PaymentMethod,
    ) -> DomainResult<PaymentReceipt> {
        let receipt = self
            .repos
            .payments()
            .record(
                NewPayment {
                    reservation_id,
                    user_id: actor.user_id,
                    amount,
                    method,
                },
                self.clock.now(),
            )
            .await?;

        metrics::counter!("payments_recorded_total", "method" => method.as_str()).increment(1);
        info!(
            payment_id = receipt.payment.id,
            reservation_id,
            amount,
            activated = receipt.activated,
            "💳 Payment recorded"
        );

        if receipt.activated {
            self.notifier.notify().await;
        }
        Ok(receipt)
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> DomainResult<Reservation> {
        self.load_for(actor, id).await
    }

    pub async fn list_for_user(&self, actor: &Actor, user_id: i32) -> DomainResult<Vec<Reservation>> {
        if !actor.may_act_for(user_id) {
            return Err(DomainError::Forbidden(
                "Cannot list another user's reservations".into(),
            ));
        }
        self.repos.reservations().find_by_user(user_id).await
    }

    /// A user's reservations, each paired with the spot it books
    pub async fn history(
        &self,
        actor: &Actor,
        user_id: i32,
    ) -> DomainResult<Vec<(Reservation, Option<ParkingSpot>)>> {
        let reservations = self.list_for_user(actor, user_id).await?;
        if reservations.is_empty() {
            return Ok(Vec::new());
        }
        let spots: HashMap<i32, ParkingSpot> = self
            .repos
            .spots()
            .find_all()
            .await?
            .into_iter()
            .map(|spot| (spot.id, spot))
            .collect();
        Ok(reservations
            .into_iter()
            .map(|r| {
                let spot = spots.get(&r.spot_id).cloned();
                (r, spot)
            })
            .collect())
    }

    /// Resolve `id` under `/users/{user_id}/...`. A reservation held by a
    /// different user reads as missing there.
    pub async fn get_for_user(&self, actor: &Actor, user_id: i32, id: i32) -> DomainResult<Reservation> {
        if !actor.may_act_for(user_id) {
            return Err(DomainError::Forbidden(
                "Cannot act on another user's reservations".into(),
            ));
        }
        let reservation = self.load_for(actor, id).await?;
        if reservation.user_id != user_id {
            return Err(DomainError::not_found("Reservation", id));
        }
        Ok(reservation)
    }

    async fn load_for(&self, actor: &Actor, id: i32) -> DomainResult<Reservation> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        if !actor.may_act_for(reservation.user_id) {
            return Err(DomainError::Forbidden(format!(
                "Reservation {} belongs to another user",
                id
            )));
        }
        Ok(reservation)
    }
}

fn record_rejection(err: &DomainError) {
    metrics::counter!("reservations_rejected_total", "reason" => err.code()).increment(1);
    debug!(code = err.code(), "Reservation write rejected: {}", err);
}
