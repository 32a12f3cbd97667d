//! Equated monthly installment (EMI) and reducing-balance amortization schedules.

pub mod error;
pub mod loan;
pub mod options;

pub use error::LoanError;
pub use loan::{calculate, calculate_with, AmortizationResult, LoanInput, PaymentRecord};
pub use options::ScheduleOptions;
