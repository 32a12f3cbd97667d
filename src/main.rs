use emi::loan::*;
use log::{info, warn};
use simple_logger::SimpleLogger;

fn main() -> Result<(), log::SetLoggerError> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    match calculate(100000., 8.5, 1.) {
        Some(result) => {
            info!("{}", result);
            result.show_amortization();
        }
        None => warn!("cannot compute a schedule for the sample loan"),
    }
    Ok(())
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<LoanInput>();
    is_normal::<PaymentRecord>();
    is_normal::<AmortizationResult>();
}
