//! Mortgage payment and amortization calculations.
//!
//! [`loan`] holds the computational core: the level monthly payment of a
//! fixed-rate loan and the month-by-month amortization schedule, with extra
//! principal payments and early payoff. [`home`] wraps it with the purchase
//! side of a mortgage (down payment, property tax, insurance, HOA fees).

pub mod error;
pub mod home;
pub mod loan;

pub use error::{MortgageError, Result};
pub use home::{HomePurchase, PaymentBreakdown};
pub use loan::{
    compute_monthly_payment, generate_amortization_schedule, Amortization, CumulativeTotals,
    LoanTerms, ScheduleEntry, ScheduleSummary,
};
