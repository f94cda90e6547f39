//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use tracing::debug;

use super::reservation_repository::{self as reservations, refresh_spot_occupancy};
use crate::domain::payment::{
    NewPayment, Payment, PaymentMethod, PaymentReceipt, PaymentRepository, PaymentStatus,
};
use crate::domain::reservation::ReservationStatus;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{payment, reservation};

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment::Model) -> DomainResult<Payment> {
    let corrupt = |what: &str, value: &str| {
        DomainError::Internal(format!("Payment {} has unknown {} '{}'", m.id, what, value))
    };
    let status = m
        .status
        .parse::<PaymentStatus>()
        .map_err(|_| corrupt("status", &m.status))?;
    let method = m
        .payment_method
        .parse::<PaymentMethod>()
        .map_err(|_| corrupt("method", &m.payment_method))?;
    Ok(Payment {
        id: m.id,
        reservation_id: m.reservation_id,
        user_id: m.user_id,
        amount: m.amount,
        status,
        method,
        created_at: m.created_at,
    })
}

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn record(&self, new: NewPayment, now: DateTime<Utc>) -> DomainResult<PaymentReceipt> {
        new.validate()?;
        debug!(
            reservation_id = new.reservation_id,
            user_id = new.user_id,
            amount = new.amount,
            "Recording payment"
        );

        let txn = self.db.begin().await?;
        let existing = reservation::Entity::find_by_id(new.reservation_id)
            .filter(reservation::Column::UserId.eq(new.user_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", new.reservation_id))?;
        let current = reservations::model_to_domain(existing.clone())?;
        let activated = current.activates_on_payment(now)?;

        let paid = payment::ActiveModel {
            reservation_id: Set(new.reservation_id),
            user_id: Set(new.user_id),
            amount: Set(new.amount),
            status: Set(PaymentStatus::Completed.as_str().to_string()),
            payment_method: Set(new.method.as_str().to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let reservation_model = if activated {
            let mut active: reservation::ActiveModel = existing.into();
            active.status = Set(ReservationStatus::Active.as_str().to_string());
            active.updated_at = Set(now);
            let model = active.update(&txn).await?;
            refresh_spot_occupancy(&txn, model.parking_spot_id, now).await?;
            model
        } else {
            existing
        };

        txn.commit().await?;
        Ok(PaymentReceipt {
            payment: model_to_domain(paid)?,
            reservation: reservations::model_to_domain(reservation_model)?,
            activated,
        })
    }
}
