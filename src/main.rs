use clap::{Args, Parser, Subcommand};
use log::{error, info};
use mortgage::{home::HomePurchase, Result};
use simple_logger::SimpleLogger;
use std::process;

/// Mortgage payment breakdowns and amortization schedules
#[derive(Parser)]
#[command(name = "mortgage", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: log::LevelFilter,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly payment breakdown including taxes, insurance and HOA fees
    Payment(PurchaseArgs),
    /// Month-by-month amortization schedule
    Schedule(ScheduleArgs),
}

#[derive(Args)]
struct PurchaseArgs {
    #[arg(long, default_value_t = 425000.)]
    home_price: f64,

    /// Down payment in dollars
    #[arg(long, default_value_t = 21250., conflicts_with = "down_payment_percent")]
    down_payment: f64,

    /// Down payment as a percentage of the home price
    #[arg(long)]
    down_payment_percent: Option<f64>,

    #[arg(long, default_value_t = 30)]
    term_years: u32,

    /// Annual interest rate in percent
    #[arg(long, default_value_t = 5.)]
    rate: f64,

    /// Annual property tax rate in percent
    #[arg(long, default_value_t = 0.8)]
    property_tax_rate: f64,

    /// Annual homeowners insurance
    #[arg(long, default_value_t = 792.)]
    insurance: f64,

    /// Monthly HOA fees
    #[arg(long, default_value_t = 0.)]
    hoa: f64,
}

#[derive(Args)]
struct ScheduleArgs {
    #[command(flatten)]
    purchase: PurchaseArgs,

    /// Extra principal paid every month
    #[arg(long, default_value_t = 0.)]
    extra: f64,

    /// Also print cumulative principal and interest paid
    #[arg(long)]
    cumulative: bool,
}

impl PurchaseArgs {
    fn to_purchase(&self) -> Result<HomePurchase> {
        let home = HomePurchase {
            home_price: self.home_price,
            down_payment: self.down_payment,
            term_years: self.term_years,
            annual_rate_percent: self.rate,
            property_tax_rate_percent: self.property_tax_rate,
            annual_insurance: self.insurance,
            monthly_hoa: self.hoa,
        };
        match self.down_payment_percent {
            Some(percent) => home.with_down_payment_percent(percent),
            None => Ok(home),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level).init() {
        eprintln!("failed to initialize logger: {}", e);
    }

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Payment(args) => {
            let home = args.to_purchase()?;
            let breakdown = home.monthly_breakdown()?;
            info!(
                "loan of {} over {} years at {}%",
                fmt_currency(home.loan_principal()),
                home.term_years,
                home.annual_rate_percent
            );
            println!("{}", breakdown);
        }
        Commands::Schedule(args) => {
            let terms = args.purchase.to_purchase()?.loan_terms(args.extra)?;
            let summary = terms.schedule();

            summary.show_amortization();
            if args.cumulative {
                for totals in summary.cumulative_totals() {
                    println!(
                        "month {}, principal paid ${:.2}, interest paid ${:.2}",
                        totals.month, totals.principal_paid, totals.interest_paid
                    );
                }
            }
            println!(
                "Total Interest Paid: {}",
                fmt_currency(summary.total_interest_paid)
            );
            println!("Loan Paid Off in {} months", summary.payoff_month);
            let saved = summary.months_saved(terms.pmt_count());
            if saved > 0 {
                info!("extra payments save {} months", saved);
            }
        }
    }
    Ok(())
}

// $1,234,567.89
fn fmt_currency(amount: f64) -> String {
    let cents = format!("{:.2}", amount.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0. { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<mortgage::ScheduleEntry>();
    is_normal::<mortgage::ScheduleSummary>();
    is_normal::<mortgage::Amortization>();
    is_normal::<mortgage::MortgageError>();
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn test_fmt_currency() {
    assert_eq!(fmt_currency(115838.1892), "$115,838.19");
    assert_eq!(fmt_currency(599.55), "$599.55");
    assert_eq!(fmt_currency(1234567.891), "$1,234,567.89");
    assert_eq!(fmt_currency(0.), "$0.00");
    assert_eq!(fmt_currency(-1000.), "-$1,000.00");
}

#[test]
fn test_percent_overrides_amount() {
    let cli = Cli::parse_from(["mortgage", "payment", "--down-payment-percent", "20"]);
    let Commands::Payment(args) = cli.command else {
        panic!("expected payment command");
    };
    let home = args.to_purchase().unwrap();
    assert!((home.down_payment - 85000.).abs() < 1e-6);

    assert!(Cli::try_parse_from([
        "mortgage",
        "schedule",
        "--down-payment",
        "1000",
        "--down-payment-percent",
        "20",
    ])
    .is_err());
}
