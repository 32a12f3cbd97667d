use chrono::{Months, NaiveDate};
use log::{debug, trace, warn};
use std::fmt;

use crate::error::LoanError;
use crate::options::ScheduleOptions;

const MONTHS_PER_YEAR: f64 = 12.;
// how far tenure_years * 12 may sit from a whole month count
const WHOLE_MONTH_TOLERANCE: f64 = 1e-9;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LoanInput {
    pub principal: f64,
    pub annual_rate: f64, // percent, i.e. 8.5 for 8.5%
    pub tenure_years: f64,
}

impl LoanInput {
    pub fn new(principal: f64, annual_rate: f64, tenure_years: f64) -> Self {
        Self {
            principal,
            annual_rate,
            tenure_years,
        }
    }

    /// Interest rate applied to the outstanding balance each month, as a fraction.
    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate / MONTHS_PER_YEAR / 100.
    }

    /// Number of monthly payments. Tenures that do not cover a whole number of
    /// months (1.3 years) are rejected; 1.5 years is 18 payments.
    pub fn tenure_months(&self) -> Result<u32, LoanError> {
        let months = self.tenure_years * MONTHS_PER_YEAR;
        let whole = months.round();

        if (months - whole).abs() > WHOLE_MONTH_TOLERANCE {
            return Err(LoanError::InvalidInput {
                field: "tenure_years",
                value: self.tenure_years,
                reason: "must cover a whole number of months",
            });
        }
        if whole < 1. {
            return Err(LoanError::InvalidInput {
                field: "tenure_years",
                value: self.tenure_years,
                reason: "must cover at least one month",
            });
        }
        if whole > u32::MAX as f64 {
            return Err(LoanError::InvalidInput {
                field: "tenure_years",
                value: self.tenure_years,
                reason: "covers too many months to schedule",
            });
        }
        Ok(whole as u32)
    }

    /// Checks every parameter and returns the payment count.
    pub fn validate(&self) -> Result<u32, LoanError> {
        check_positive("principal", self.principal)?;
        check_positive("annual_rate", self.annual_rate)?;
        check_positive("tenure_years", self.tenure_years)?;
        self.tenure_months()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, PartialEq, Debug)]
pub struct PaymentRecord {
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub display_date: String,
    pub emi: f64,
    pub principal: f64,
    pub interest: f64,
    pub remaining_balance: f64,
}

impl PaymentRecord {
    pub fn new(
        payment_number: u32,
        payment_date: NaiveDate,
        display_date: String,
        emi: f64,
        principal: f64,
        interest: f64,
        remaining_balance: f64,
    ) -> Self {
        Self {
            payment_number,
            payment_date,
            display_date,
            emi,
            principal,
            interest,
            remaining_balance,
        }
    }
}

impl fmt::Display for PaymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, date {}, emi ${:.2}, principal ${:.2}, interest ${:.2}, remaining balance ${:.2}",
            self.payment_number,
            self.display_date,
            self.emi,
            self.principal,
            self.interest,
            self.remaining_balance
        )
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, PartialEq, Debug)]
pub struct AmortizationResult {
    pub monthly_emi: f64,
    pub total_interest: f64,
    pub total_payable: f64,
    pub amortization_schedule: Vec<PaymentRecord>,
}

impl AmortizationResult {
    pub fn payment_count(&self) -> usize {
        self.amortization_schedule.len()
    }

    /// Record for a 1-based payment number.
    pub fn payment(&self, pmt_number: usize) -> Option<&PaymentRecord> {
        pmt_number
            .checked_sub(1)
            .and_then(|idx| self.amortization_schedule.get(idx))
    }

    pub fn payment_info(&self, pmt_number: usize) -> String {
        match self.payment(pmt_number) {
            Some(pmt) => pmt.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    pub fn show_amortization(&self) {
        for pmt in &self.amortization_schedule {
            println!("{}", pmt);
        }
    }
}

impl fmt::Display for AmortizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} payments, monthly emi ${:.2}, total interest ${:.2}, total payable ${:.2}",
            self.payment_count(),
            self.monthly_emi,
            self.total_interest,
            self.total_payable
        )
    }
}

/// Computes the schedule anchored on today's date. Returns `None` when any of
/// the inputs is not strictly positive or the tenure is not a whole number of
/// months.
pub fn calculate(
    principal: f64,
    annual_rate: f64,
    tenure_years: f64,
) -> Option<AmortizationResult> {
    calculate_with(
        &LoanInput::new(principal, annual_rate, tenure_years),
        &ScheduleOptions::default(),
    )
    .ok()
}

/// Builds the full reducing-balance schedule.
///
/// Interest and balance are carried at full precision from one period to the
/// next; only the emitted fields are rounded. `total_interest` is rounded once
/// after summation and the final balance is forced to zero.
pub fn calculate_with(
    input: &LoanInput,
    options: &ScheduleOptions,
) -> Result<AmortizationResult, LoanError> {
    options.validate()?;
    let start_date = options.anchor_date();
    let months = input
        .validate()
        .and_then(|months| last_payment_within_calendar(&start_date, months, input))
        .map_err(|e| {
            warn!("loan rejected: {}", e);
            e
        })?;

    let monthly_rate = input.monthly_rate();
    let emi = get_emi(input.principal, monthly_rate, months);
    if !emi.is_finite() || !(emi * months as f64).is_finite() {
        let e = LoanError::InvalidInput {
            field: "principal",
            value: input.principal,
            reason: "total repayment exceeds the floating point range",
        };
        warn!("loan rejected: {}", e);
        return Err(e);
    }
    let dec_places = options.dec_places;
    debug!(
        "principal {}, monthly rate {}, {} payments of {}",
        input.principal, monthly_rate, months, emi
    );

    let mut schedule = Vec::with_capacity(months as usize);
    let mut remaining_balance = input.principal;
    let mut total_interest = 0.;

    for pmt_number in 1..=months {
        let interest = remaining_balance * monthly_rate;
        let principal = emi - interest;
        remaining_balance -= principal;
        total_interest += interest;

        if pmt_number == months {
            trace!("absorbing final balance drift of {}", remaining_balance);
            remaining_balance = 0.;
        }

        let pmt_date = payment_date(&start_date, pmt_number)?;
        trace!(
            "pmt # {}, date {}, interest {}, principal {}, end bal {}",
            pmt_number,
            pmt_date,
            interest,
            principal,
            remaining_balance
        );

        schedule.push(PaymentRecord::new(
            pmt_number,
            pmt_date,
            pmt_date.format(&options.date_format).to_string(),
            round(emi, dec_places),
            round(principal, dec_places),
            round(interest, dec_places),
            round(remaining_balance, dec_places),
        ));
    }

    Ok(AmortizationResult {
        monthly_emi: round(emi, dec_places),
        total_interest: round(total_interest, dec_places),
        total_payable: round(emi * months as f64, dec_places),
        amortization_schedule: schedule,
    })
}

/// Unrounded annuity payment that retires `principal` in `months` equal
/// installments at `monthly_rate` per period.
pub fn get_emi(principal: f64, monthly_rate: f64, months: u32) -> f64 {
    let factor = (1. + monthly_rate).powf(months as f64);

    if factor <= 1. {
        // rate too small to register against 1.0
        principal / months as f64
    } else {
        // P·r·f / (f - 1) divided through by f, so the numerator cannot overflow
        principal * monthly_rate / (1. - factor.recip())
    }
}

/// `start_date` advanced by `pmt_number` calendar months. Days past the end of
/// the target month clamp to its last day (Jan 31 -> Feb 29 -> Mar 31).
pub fn payment_date(start_date: &NaiveDate, pmt_number: u32) -> Result<NaiveDate, LoanError> {
    start_date
        .checked_add_months(Months::new(pmt_number))
        .ok_or(LoanError::InvalidInput {
            field: "tenure_years",
            value: pmt_number as f64 / MONTHS_PER_YEAR,
            reason: "payment date is outside the supported calendar",
        })
}

fn last_payment_within_calendar(
    start_date: &NaiveDate,
    months: u32,
    input: &LoanInput,
) -> Result<u32, LoanError> {
    match start_date.checked_add_months(Months::new(months)) {
        Some(_) => Ok(months),
        None => Err(LoanError::InvalidInput {
            field: "tenure_years",
            value: input.tenure_years,
            reason: "final payment date is outside the supported calendar",
        }),
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), LoanError> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(LoanError::InvalidInput {
            field,
            value,
            reason: "must be a finite number greater than zero",
        })
    }
}

fn round(amt: f64, dec_places: u32) -> f64 {
    let scale = 10_f64.powi(dec_places as i32);
    let scaled = amt * scale;
    if !scaled.is_finite() {
        // too large to carry any fractional digits
        return amt;
    }
    let rounded = scaled.round() / scale;
    // collapse -0.0
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}


#[cfg(test)]
mod prop_tests {
    use super::{calculate_with, LoanInput};
    use crate::options::ScheduleOptions;
    use chrono::NaiveDate;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const CENT: f64 = 0.01;
    const EPS: f64 = 1e-9;

    fn options() -> ScheduleOptions {
        ScheduleOptions::new().with_start_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_schedule_is_complete_and_settles(
            principal in 1_000u32..5_000_000,
            rate_bp in 1u32..3_000,
            years in 1u32..31
        ) {
            let input = LoanInput::new(principal as f64, rate_bp as f64 / 100., years as f64);
            let result = calculate_with(&input, &options()).unwrap();
            let months = years * 12;

            prop_assert_eq!(result.payment_count(), months as usize);
            for (idx, pmt) in result.amortization_schedule.iter().enumerate() {
                prop_assert_eq!(pmt.payment_number, idx as u32 + 1);
            }
            prop_assert_eq!(result.amortization_schedule[months as usize - 1].remaining_balance, 0.);

            let repaid: f64 = result.amortization_schedule.iter().map(|pmt| pmt.principal).sum();
            prop_assert!((repaid - principal as f64).abs() <= CENT * months as f64);
        }

        #[test]
        fn prop_payments_split_and_shrink(
            principal in 1_000u32..5_000_000,
            rate_bp in 1u32..3_000,
            years in 1u32..31
        ) {
            let input = LoanInput::new(principal as f64, rate_bp as f64 / 100., years as f64);
            let result = calculate_with(&input, &options()).unwrap();

            for pmt in &result.amortization_schedule {
                prop_assert_eq!(pmt.emi, result.monthly_emi);
                prop_assert!((pmt.principal + pmt.interest - pmt.emi).abs() <= CENT + EPS);
            }
            for pair in result.amortization_schedule.windows(2) {
                prop_assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
                prop_assert!(pair[1].interest <= pair[0].interest);
                prop_assert!(pair[1].payment_date > pair[0].payment_date);
            }
        }
    }
}
