//! Payment domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::reservation::Reservation;
use crate::support::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash" => Ok(Self::Cash),
            other => Err(DomainError::InvalidInput(format!(
                "Unsupported payment method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidInput(format!(
                "Unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// Recorded payment for a reservation
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: i32,
    pub reservation_id: i32,
    pub user_id: i32,
    pub amount: f64,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub reservation_id: i32,
    pub user_id: i32,
    pub amount: f64,
    pub method: PaymentMethod,
}

impl NewPayment {
    pub fn validate(&self) -> DomainResult<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(DomainError::InvalidInput(
                "Payment amount must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Result of recording a payment
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// Reservation state after the payment was applied
    pub reservation: Reservation,
    pub activated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_must_be_positive() {
        let mut payment = NewPayment {
            reservation_id: 1,
            user_id: 1,
            amount: 0.0,
            method: PaymentMethod::Card,
        };
        assert!(payment.validate().is_err());
        payment.amount = f64::NAN;
        assert!(payment.validate().is_err());
        payment.amount = 4.5;
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn method_parse() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("crypto".parse::<PaymentMethod>().is_err());
    }
}
