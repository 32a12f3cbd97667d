use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate};

use crate::error::LoanError;

/// Month/day/year without padding, e.g. `3/7/2025`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";
pub const DEFAULT_DEC_PLACES: u32 = 2;
// roughly the decimal precision of an f64
pub const MAX_DEC_PLACES: u32 = 15;

/// Knobs for schedule generation. Defaults anchor the schedule on today's local date.
#[derive(Clone, PartialEq, Debug)]
pub struct ScheduleOptions {
    pub start_date: Option<NaiveDate>,
    pub date_format: String,
    pub dec_places: u32,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            dec_places: DEFAULT_DEC_PLACES,
        }
    }
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_date_format(mut self, date_format: &str) -> Self {
        self.date_format = date_format.to_string();
        self
    }

    pub fn with_dec_places(mut self, dec_places: u32) -> Self {
        self.dec_places = dec_places;
        self
    }

    /// The date payments are counted from; the first payment falls one month later.
    pub fn anchor_date(&self) -> NaiveDate {
        self.start_date.unwrap_or_else(|| Local::now().date_naive())
    }

    // chrono panics when a bad specifier reaches `to_string`, so reject it up front
    pub fn validate(&self) -> Result<(), LoanError> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(LoanError::InvalidDateFormat(self.date_format.clone()));
        }
        if self.dec_places > MAX_DEC_PLACES {
            return Err(LoanError::InvalidDecPlaces(self.dec_places));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ScheduleOptions, DEFAULT_DATE_FORMAT, MAX_DEC_PLACES};
    use crate::error::LoanError;
    use chrono::NaiveDate;
    use test_log::test;

    #[test]
    fn test_defaults() {
        let options = ScheduleOptions::default();
        assert_eq!(options.start_date, None);
        assert_eq!(options.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(options.dec_places, 2);
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn test_anchor_date() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let options = ScheduleOptions::new().with_start_date(start);
        assert_eq!(options.anchor_date(), start);
    }

    #[test]
    fn test_bad_date_format() {
        let options = ScheduleOptions::new().with_date_format("%Y-%");
        assert_eq!(
            options.validate(),
            Err(LoanError::InvalidDateFormat("%Y-%".to_string()))
        );

        let options = ScheduleOptions::new().with_date_format("%d.%m.%Y");
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn test_dec_places_bound() {
        assert_eq!(
            ScheduleOptions::new().with_dec_places(MAX_DEC_PLACES).validate(),
            Ok(())
        );
        assert_eq!(
            ScheduleOptions::new().with_dec_places(400).validate(),
            Err(LoanError::InvalidDecPlaces(400))
        );
        assert_eq!(
            ScheduleOptions::new().with_dec_places(u32::MAX).validate(),
            Err(LoanError::InvalidDecPlaces(u32::MAX))
        );
    }
}
