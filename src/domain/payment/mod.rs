//! Payment aggregate

pub mod model;
pub mod repository;

pub use model::{NewPayment, Payment, PaymentMethod, PaymentReceipt, PaymentStatus};
pub use repository::PaymentRepository;
