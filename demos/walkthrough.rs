/// walkthrough - a 50 week loan under controlled time
use billing_engine_rs::{BillingEngine, LoanView, Money, Rate, SafeTimeProvider, TimeSource};
use chrono::{Duration, TimeZone, Utc};
use log::info;
use simple_logger::SimpleLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    println!("=== billing engine walkthrough ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let start = time.now();

    // 5,000,000 over 50 weeks at 10% flat
    let mut billing = BillingEngine::new();
    let weekly = billing
        .create_loan("100", Money::from_major(5_000_000), Rate::from_percentage(10), 50, start)?
        .weekly_payment;

    println!("payment schedule:");
    for installment in billing.get_payment_schedule("100")? {
        println!("  {}", installment);
    }

    println!("\ninitial outstanding: {}", billing.get_outstanding_with("100", &time).round_dp(2));

    // pay weeks 1 and 2 on their due dates
    for _ in 0..2 {
        controller.advance(Duration::days(7));
        billing.make_payment_with("100", weekly, &time)?;
    }
    println!("outstanding after 2 payments: {}", billing.get_outstanding_with("100", &time).round_dp(2));
    println!("delinquent? {}", billing.is_delinquent_with("100", &time));

    // miss weeks 3, 4 and 5
    println!("\nsimulating 3 missed payments...");
    controller.advance(Duration::days(21) + Duration::hours(1));
    println!("current time: {}", time.now().format("%Y-%m-%d %H:%M"));
    println!("delinquent? {}", billing.is_delinquent_with("100", &time));
    println!("outstanding: {}", billing.get_outstanding_with("100", &time).round_dp(2));

    // a wrong amount is rejected outright
    if let Err(err) = billing.make_payment_with("100", Money::from_major(100_000), &time) {
        println!("\nrejected: {}", err);
    }

    billing.make_payment_with("100", weekly, &time)?;
    println!("\nafter one catch-up payment:");
    println!("delinquent? {}", billing.is_delinquent_with("100", &time));
    println!("outstanding: {}", billing.get_outstanding_with("100", &time).round_dp(2));

    info!("{} events recorded", billing.events().len());

    if let Some(loan) = billing.get_loan("100") {
        let view = LoanView::from_loan(loan, time.now(), billing.config());
        println!("\nloan state:\n{}", view.to_json_pretty()?);
    }

    Ok(())
}
