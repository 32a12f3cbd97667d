use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoanError {
    /// A loan parameter that cannot produce a schedule.
    #[error("invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("invalid decimal places: {0} (at most 15)")]
    InvalidDecPlaces(u32),
}
