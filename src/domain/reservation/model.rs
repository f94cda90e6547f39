//! Reservation domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::support::errors::{DomainError, DomainResult};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Created, waiting for its start time
    Pending,
    /// Start time reached, spot in use
    Active,
    /// End time reached
    Completed,
    /// Cancelled by its owner
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that hold a claim on the spot.
    pub const LIVE: [ReservationStatus; 2] = [Self::Pending, Self::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Edges of the lifecycle graph. Staying in the same status is not an edge.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Completed) | (Pending, Cancelled) | (Active, Cancelled)
        )
    }

    pub fn ensure_transition(&self, next: ReservationStatus) -> DomainResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "Unknown reservation status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Like [`TimeRange::new`], additionally rejecting a start before `now`.
    pub fn upcoming(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult<Self> {
        let range = Self::new(start, end)?;
        if start < now {
            return Err(DomainError::InvalidTimeRange { start, end });
        }
        Ok(range)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn price(&self, price_per_hour: f64) -> f64 {
        self.hours() * price_per_hour
    }
}

/// Time-boxed claim on a parking spot
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub spot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Validates `changes` against the current state and resolves the
    /// resulting interval and status.
    pub fn plan_update(
        &self,
        changes: &ReservationChanges,
        now: DateTime<Utc>,
    ) -> DomainResult<PlannedUpdate> {
        let new_start = changes.start_time.unwrap_or(self.start_time);
        let new_end = changes.end_time.unwrap_or(self.end_time);
        let reschedule = new_start != self.start_time || new_end != self.end_time;

        let mut status = self.status;
        if let Some(next) = changes.status {
            if next != self.status {
                self.status.ensure_transition(next)?;
            }
            status = next;
        }

        let range = if reschedule {
            if !self.status.is_live() {
                return Err(DomainError::InvalidInput(format!(
                    "A {} reservation cannot be rescheduled",
                    self.status
                )));
            }
            let range = TimeRange::new(new_start, new_end)?;
            if new_start != self.start_time {
                if self.status == ReservationStatus::Active {
                    return Err(DomainError::InvalidInput(
                        "The start of an active reservation cannot be moved".to_string(),
                    ));
                }
                if new_start < now {
                    return Err(DomainError::InvalidTimeRange {
                        start: new_start,
                        end: new_end,
                    });
                }
            }
            range
        } else {
            self.range()
        };

        // Time-driven edges still need their time to have come
        match (self.status, status) {
            (ReservationStatus::Pending, ReservationStatus::Active) if range.start > now => {
                return Err(DomainError::InvalidTransition {
                    from: self.status.to_string(),
                    to: status.to_string(),
                });
            }
            (ReservationStatus::Active, ReservationStatus::Completed) if range.end > now => {
                return Err(DomainError::InvalidTransition {
                    from: self.status.to_string(),
                    to: status.to_string(),
                });
            }
            _ => {}
        }

        Ok(PlannedUpdate {
            range,
            status,
            reschedule,
        })
    }

    /// Payment side effect: returns whether the payment activates the reservation.
    pub fn activates_on_payment(&self, now: DateTime<Utc>) -> DomainResult<bool> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: "paid".to_string(),
            });
        }
        Ok(self.status == ReservationStatus::Pending && self.start_time <= now)
    }
}

/// Input for a new reservation. The range is already validated.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: i32,
    pub vehicle_id: i32,
    pub spot_id: i32,
    pub range: TimeRange,
}

/// Partial edit requested by a client
#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
}

/// Outcome of [`Reservation::plan_update`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub range: TimeRange,
    pub status: ReservationStatus,
    /// Interval changed, so the price is recomputed and overlap rechecked.
    pub reschedule: bool,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    fn reservation(status: ReservationStatus) -> Reservation {
        Reservation {
            id: 1,
            user_id: 7,
            vehicle_id: 3,
            spot_id: 11,
            start_time: at(10, 0),
            end_time: at(11, 0),
            status,
            total_price: 2.0,
            created_at: at(8, 0),
            updated_at: at(8, 0),
        }
    }

    #[test]
    fn range_rejects_empty_and_inverted() {
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeRange::new(at(11, 0), at(10, 0)).is_err());
        assert!(TimeRange::new(at(10, 0), at(10, 1)).is_ok());
    }

    #[test]
    fn upcoming_rejects_past_start() {
        let err = TimeRange::upcoming(at(9, 0), at(10, 0), at(10, 0)).unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME_RANGE");
        assert!(TimeRange::upcoming(at(10, 0), at(11, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn half_open_overlap() {
        let a = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
        let b = TimeRange::new(at(10, 30), at(11, 30)).unwrap();
        let adjacent = TimeRange::new(at(11, 0), at(12, 0)).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&adjacent));
        assert!(!adjacent.overlaps(&a));
        assert!(a.contains(at(10, 0)));
        assert!(!a.contains(at(11, 0)));
    }

    #[test]
    fn price_is_hours_times_rate() {
        let range = TimeRange::new(at(10, 0), at(11, 30)).unwrap();
        assert!((range.price(2.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lifecycle_graph() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Cancelled));

        assert!(!Active.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
        for terminal in [Completed, Cancelled] {
            for next in [Pending, Active, Completed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for s in ["pending", "active", "completed", "cancelled"] {
            assert_eq!(s.parse::<ReservationStatus>().unwrap().as_str(), s);
        }
        assert!("expired".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn extending_end_reschedules() {
        let r = reservation(ReservationStatus::Active);
        let plan = r
            .plan_update(
                &ReservationChanges {
                    end_time: Some(at(12, 0)),
                    ..Default::default()
                },
                at(10, 15),
            )
            .unwrap();
        assert!(plan.reschedule);
        assert_eq!(plan.status, ReservationStatus::Active);
        assert_eq!(plan.range.end, at(12, 0));
    }

    #[test]
    fn active_start_cannot_move() {
        let r = reservation(ReservationStatus::Active);
        let err = r
            .plan_update(
                &ReservationChanges {
                    start_time: Some(at(10, 30)),
                    ..Default::default()
                },
                at(10, 15),
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn moving_start_into_past_rejected() {
        let r = reservation(ReservationStatus::Pending);
        let err = r
            .plan_update(
                &ReservationChanges {
                    start_time: Some(at(8, 0)),
                    ..Default::default()
                },
                at(9, 0),
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME_RANGE");
    }

    #[test]
    fn status_never_regresses() {
        let r = reservation(ReservationStatus::Active);
        let err = r
            .plan_update(
                &ReservationChanges {
                    status: Some(ReservationStatus::Pending),
                    ..Default::default()
                },
                at(10, 15),
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn early_activation_rejected() {
        let r = reservation(ReservationStatus::Pending);
        let changes = ReservationChanges {
            status: Some(ReservationStatus::Active),
            ..Default::default()
        };
        assert!(r.plan_update(&changes, at(9, 59)).is_err());
        assert_eq!(
            r.plan_update(&changes, at(10, 0)).unwrap().status,
            ReservationStatus::Active
        );
    }

    #[test]
    fn same_status_is_a_no_op() {
        let r = reservation(ReservationStatus::Cancelled);
        let plan = r
            .plan_update(
                &ReservationChanges {
                    status: Some(ReservationStatus::Cancelled),
                    ..Default::default()
                },
                at(12, 0),
            )
            .unwrap();
        assert!(!plan.reschedule);
        assert_eq!(plan.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn payment_activation_waits_for_start() {
        let r = reservation(ReservationStatus::Pending);
        assert!(!r.activates_on_payment(at(9, 0)).unwrap());
        assert!(r.activates_on_payment(at(10, 0)).unwrap());
        assert!(!reservation(ReservationStatus::Active)
            .activates_on_payment(at(10, 30))
            .unwrap());
        assert!(reservation(ReservationStatus::Cancelled)
            .activates_on_payment(at(10, 30))
            .is_err());
    }
}
