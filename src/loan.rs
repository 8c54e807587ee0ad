use crate::error::{MortgageError, Result};
use log::{debug, trace, warn};
use std::{fmt, iter::FusedIterator};

/// Validated inputs of a fixed-rate loan.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoanTerms {
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    extra_monthly_payment: f64,
    pmt_amount: f64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleEntry {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

impl ScheduleEntry {
    pub fn new(month: u32, payment: f64, principal: f64, interest: f64, balance: f64) -> Self {
        Self {
            month,
            payment,
            principal,
            interest,
            balance,
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, payment ${:.2}, principal ${:.2}, interest ${:.2}, balance ${:.2}",
            self.month, self.payment, self.principal, self.interest, self.balance
        )
    }
}

/// Running totals after a given month, the series behind a
/// principal-vs-interest chart.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CumulativeTotals {
    pub month: u32,
    pub principal_paid: f64,
    pub interest_paid: f64,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleSummary {
    pub entries: Vec<ScheduleEntry>,
    pub total_interest_paid: f64,
    pub payoff_month: u32,
}

impl ScheduleSummary {
    fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        let total_interest_paid = entries.iter().map(|e| e.interest).sum();
        let payoff_month = entries.len() as u32;
        Self {
            entries,
            total_interest_paid,
            payoff_month,
        }
    }

    /// Sum of the principal components. Can exceed the original principal by
    /// the overshoot of the final payment.
    pub fn total_principal_paid(&self) -> f64 {
        self.entries.iter().map(|e| e.principal).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.total_principal_paid() + self.total_interest_paid
    }

    pub fn months_saved(&self, nominal_months: u32) -> u32 {
        nominal_months.saturating_sub(self.payoff_month)
    }

    pub fn cumulative_totals(&self) -> Vec<CumulativeTotals> {
        let mut principal_paid = 0.;
        let mut interest_paid = 0.;
        self.entries
            .iter()
            .map(|e| {
                principal_paid += e.principal;
                interest_paid += e.interest;
                CumulativeTotals {
                    month: e.month,
                    principal_paid,
                    interest_paid,
                }
            })
            .collect()
    }

    pub fn show_amortization(&self) {
        for entry in &self.entries {
            println!("{}", entry);
        }
    }
}

impl LoanTerms {
    pub fn new(
        principal: f64,
        annual_rate_percent: f64,
        term_years: u32,
        extra_monthly_payment: f64,
    ) -> Result<Self> {
        check_non_negative("principal", principal)?;
        check_non_negative("annual_rate_percent", annual_rate_percent)?;
        check_non_negative("extra_monthly_payment", extra_monthly_payment)?;
        let pmt_count = get_pmt_count(term_years)?;

        let pmt_amount = get_pmt_amount(principal, annual_rate_percent / 12. / 100., pmt_count);
        debug!(
            "principal {}, rate {}%, {} payments: base payment {}",
            principal, annual_rate_percent, pmt_count, pmt_amount
        );

        Ok(Self {
            principal,
            annual_rate_percent,
            term_years,
            extra_monthly_payment,
            pmt_amount,
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn extra_monthly_payment(&self) -> f64 {
        self.extra_monthly_payment
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 12. / 100.
    }

    /// Nominal number of monthly payments. Cannot overflow, `new` checked it.
    pub fn pmt_count(&self) -> u32 {
        self.term_years * 12
    }

    /// Level principal-and-interest payment, excluding any extra payment.
    pub fn monthly_payment(&self) -> f64 {
        self.pmt_amount
    }

    pub fn amortization(&self) -> Amortization {
        Amortization {
            monthly_rate: self.monthly_rate(),
            pmt_amount: self.pmt_amount,
            extra: self.extra_monthly_payment,
            balance: self.principal,
            month: 0,
            pmt_count: self.pmt_count(),
            paid_off: false,
        }
    }

    pub fn schedule(&self) -> ScheduleSummary {
        let summary = ScheduleSummary::from_entries(self.amortization().collect());
        debug!(
            "paid off in {} of {} months, total interest {}",
            summary.payoff_month,
            self.pmt_count(),
            summary.total_interest_paid
        );
        summary
    }
}

/// Month-by-month amortization of a loan.
///
/// The base payment stays fixed for the life of the loan; the extra payment
/// only goes to principal, so it shortens the term instead of lowering the
/// required payment. Iteration ends with the month the balance reaches zero,
/// or after the nominal number of payments.
#[derive(Clone, Debug)]
pub struct Amortization {
    monthly_rate: f64,
    pmt_amount: f64,
    extra: f64,
    balance: f64,
    month: u32,
    pmt_count: u32,
    paid_off: bool,
}

impl Iterator for Amortization {
    type Item = ScheduleEntry;

    fn next(&mut self) -> Option<ScheduleEntry> {
        if self.paid_off || self.month >= self.pmt_count {
            return None;
        }
        self.month += 1;

        let interest = self.balance * self.monthly_rate;
        let principal = self.pmt_amount - interest + self.extra;
        self.balance -= principal;

        // the final payment may overshoot; the entry keeps the computed split
        if self.balance <= 0. {
            self.balance = 0.;
            self.paid_off = true;
        }
        trace!(
            "month {}, interest {}, principal {}, end bal {}",
            self.month,
            interest,
            principal,
            self.balance
        );

        Some(ScheduleEntry::new(
            self.month,
            self.pmt_amount + self.extra,
            principal,
            interest,
            self.balance,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.paid_off {
            (0, Some(0))
        } else {
            let remaining = (self.pmt_count - self.month) as usize;
            (remaining.min(1), Some(remaining))
        }
    }
}

impl FusedIterator for Amortization {}

/// Fixed monthly principal-and-interest payment that retires `principal`
/// over `term_years` at `annual_rate_percent` (e.g. 6.0 for 6%).
pub fn compute_monthly_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<f64> {
    Ok(LoanTerms::new(principal, annual_rate_percent, term_years, 0.)?.monthly_payment())
}

pub fn generate_amortization_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    extra_monthly_payment: f64,
) -> Result<ScheduleSummary> {
    Ok(LoanTerms::new(principal, annual_rate_percent, term_years, extra_monthly_payment)?.schedule())
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        warn!("rejected {} = {}", field, value);
        Err(MortgageError::invalid_input(
            field,
            format!("must be a finite number >= 0, got {}", value),
        ))
    }
}

fn get_pmt_count(term_years: u32) -> Result<u32> {
    match term_years.checked_mul(12) {
        Some(0) => {
            warn!("rejected term_years = 0");
            Err(MortgageError::invalid_input(
                "term_years",
                "must be at least 1 year",
            ))
        }
        Some(count) => Ok(count),
        None => {
            warn!("rejected term_years = {}", term_years);
            Err(MortgageError::invalid_input(
                "term_years",
                format!("{} years is too long", term_years),
            ))
        }
    }
}

fn get_pmt_amount(principal: f64, monthly_rate: f64, pmt_count: u32) -> f64 {
    if monthly_rate == 0. {
        return principal / pmt_count as f64;
    }
    // P·r / (1 - (1+r)^-n), with the discount term taken through ln_1p/exp_m1
    // so tiny rates over long terms keep their precision
    let growth = pmt_count as f64 * monthly_rate.ln_1p();
    principal * monthly_rate / -(-growth).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::{
        compute_monthly_payment, generate_amortization_schedule, get_pmt_amount, LoanTerms,
        ScheduleEntry,
    };
    use crate::error::MortgageError;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use test_log::test;

    #[test]
    fn test_get_pmt_amount() {
        assert_abs_diff_eq!(get_pmt_amount(100000., 0.005, 360), 599.55, epsilon = 0.01);
        assert_abs_diff_eq!(get_pmt_amount(200000., 7. / 1200., 180), 1797.66, epsilon = 0.01);
        assert_abs_diff_eq!(get_pmt_amount(403750., 5. / 1200., 360), 2167.42, epsilon = 0.01);
        assert_eq!(get_pmt_amount(100000., 0., 120), 100000. / 120.);
        assert_eq!(get_pmt_amount(0., 0.005, 360), 0.);
    }

    #[test]
    fn test_tiny_rate_approaches_equal_division() {
        let pmt = compute_monthly_payment(100000., 1e-9, 30).unwrap();
        assert_relative_eq!(pmt, 100000. / 360., max_relative = 1e-9);
        assert!(pmt >= 100000. / 360.);
    }

    #[test]
    fn test_large_rate_does_not_overflow() {
        // (1+r)^n overflows f64 here; payment tends to P·r
        let pmt = compute_monthly_payment(1000., 1200., 100).unwrap();
        assert!(pmt.is_finite());
        assert_relative_eq!(pmt, 1000., max_relative = 1e-12);
    }

    #[test]
    fn test_zero_rate_payment() {
        let pmt = compute_monthly_payment(100000., 0., 10).unwrap();
        assert_relative_eq!(pmt, 833.3333333333334);
        assert_eq!(pmt, 100000. / 120.);
    }

    #[test]
    fn test_zero_principal_payment() {
        assert_eq!(compute_monthly_payment(0., 6., 30).unwrap(), 0.);
        assert_eq!(compute_monthly_payment(0., 0., 1).unwrap(), 0.);
    }

    #[test]
    fn test_invalid_inputs() {
        for (principal, rate, term) in [
            (-1., 6., 30),
            (100000., -0.5, 30),
            (100000., 6., 0),
            (f64::NAN, 6., 30),
            (100000., f64::INFINITY, 30),
        ] {
            assert!(matches!(
                compute_monthly_payment(principal, rate, term),
                Err(MortgageError::InvalidInput { .. })
            ));
        }

        assert_eq!(
            generate_amortization_schedule(100000., 6., 30, -10.),
            Err(MortgageError::invalid_input(
                "extra_monthly_payment",
                "must be a finite number >= 0, got -10"
            ))
        );
        assert!(matches!(
            LoanTerms::new(100000., 6., u32::MAX, 0.),
            Err(MortgageError::InvalidInput { field, .. }) if field == "term_years"
        ));
    }

    #[test]
    fn test_thirty_year_schedule() {
        let summary = generate_amortization_schedule(100000., 6., 30, 0.).unwrap();

        assert_eq!(summary.entries.len(), 360);
        assert_eq!(summary.payoff_month, 360);

        let first = summary.entries[0];
        assert_eq!(first.month, 1);
        assert_abs_diff_eq!(first.interest, 500., epsilon = 1e-9);
        assert_abs_diff_eq!(first.principal, 99.55, epsilon = 0.01);
        assert_abs_diff_eq!(first.balance, 99900.45, epsilon = 0.01);

        let last = summary.entries[359];
        assert_eq!(last.month, 360);
        assert_abs_diff_eq!(last.balance, 0., epsilon = 1e-6);
        assert_abs_diff_eq!(summary.total_interest_paid, 115838.19, epsilon = 0.01);
        assert_abs_diff_eq!(summary.total_principal_paid(), 100000., epsilon = 1e-6);
    }

    #[test]
    fn test_zero_rate_schedule() {
        let summary = generate_amortization_schedule(100000., 0., 10, 0.).unwrap();

        assert_eq!(summary.payoff_month, 120);
        assert_eq!(summary.total_interest_paid, 0.);
        for entry in &summary.entries {
            assert_eq!(entry.interest, 0.);
            assert_eq!(entry.principal, 100000. / 120.);
        }
        assert_abs_diff_eq!(summary.entries[119].balance, 0., epsilon = 1e-6);
    }

    #[test]
    fn test_extra_payment_shortens_term() {
        let terms = LoanTerms::new(50000., 5., 15, 200.).unwrap();
        let summary = terms.schedule();

        assert!(summary.payoff_month < 180);
        assert_eq!(summary.months_saved(terms.pmt_count()), 180 - summary.payoff_month);

        // the base payment is not recomputed with the extra payment
        let base = compute_monthly_payment(50000., 5., 15).unwrap();
        assert_eq!(terms.monthly_payment(), base);
        for entry in &summary.entries {
            assert_eq!(entry.payment, base + 200.);
        }

        let last = summary.entries.last().unwrap();
        assert_eq!(last.balance, 0.);
        // the final entry keeps the unclamped split
        assert!(summary.total_principal_paid() >= 50000. - 1e-6);
        assert!(last.principal > 0.);
    }

    #[test]
    fn test_more_extra_never_lengthens_or_costs_more() {
        let mut prev: Option<(u32, f64)> = None;
        for extra in [0., 25., 50., 100., 200., 500., 1000., 5000., 300000.] {
            let summary = generate_amortization_schedule(250000., 6.5, 30, extra).unwrap();
            if let Some((months, interest)) = prev {
                assert!(summary.payoff_month <= months);
                assert!(summary.total_interest_paid <= interest);
            }
            prev = Some((summary.payoff_month, summary.total_interest_paid));
        }
        // an extra payment larger than the loan pays it off in the first month
        assert_eq!(prev.map(|p| p.0), Some(1));
    }

    #[test]
    fn test_balance_never_increases() {
        for (principal, rate, term, extra) in [
            (100000., 6., 30, 0.),
            (320000., 3.25, 15, 150.),
            (75000., 0., 5, 40.),
            (1000., 24., 1, 0.),
        ] {
            let summary = generate_amortization_schedule(principal, rate, term, extra).unwrap();
            let mut prev = principal;
            for entry in &summary.entries {
                assert!(entry.balance >= 0.);
                assert!(entry.balance <= prev);
                prev = entry.balance;
            }
            assert!(summary.payoff_month <= term * 12);
        }
    }

    #[test]
    fn test_zero_principal_schedule() {
        let summary = generate_amortization_schedule(0., 6., 30, 0.).unwrap();
        assert_eq!(summary.payoff_month, 1);
        assert_eq!(summary.entries, vec![ScheduleEntry::new(1, 0., 0., 0., 0.)]);
        assert_eq!(summary.total_interest_paid, 0.);
    }

    #[test]
    fn test_amortization_is_lazy_and_fused() {
        let terms = LoanTerms::new(100000., 6., 30, 0.).unwrap();
        let mut months = terms.amortization();
        assert_eq!(months.size_hint(), (1, Some(360)));

        let first_year: Vec<_> = months.by_ref().take(12).collect();
        assert_eq!(first_year.len(), 12);
        assert_eq!(months.size_hint(), (1, Some(348)));
        assert_eq!(months.next().map(|e| e.month), Some(13));

        let mut paid = LoanTerms::new(100., 6., 1, 500.).unwrap().amortization();
        assert!(paid.next().is_some());
        assert_eq!(paid.size_hint(), (0, Some(0)));
        assert!(paid.next().is_none());
        assert!(paid.next().is_none());
    }

    #[test]
    fn test_cumulative_totals() {
        let summary = generate_amortization_schedule(100000., 6., 30, 100.).unwrap();
        let totals = summary.cumulative_totals();

        assert_eq!(totals.len(), summary.entries.len());
        assert_eq!(totals[0].principal_paid, summary.entries[0].principal);
        assert_eq!(totals[0].interest_paid, summary.entries[0].interest);

        let last = totals.last().unwrap();
        assert_eq!(last.month, summary.payoff_month);
        assert_relative_eq!(last.interest_paid, summary.total_interest_paid, max_relative = 1e-12);
        assert_relative_eq!(last.principal_paid, summary.total_principal_paid(), max_relative = 1e-12);
        assert_relative_eq!(
            summary.total_paid(),
            last.principal_paid + last.interest_paid,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_entry_display() {
        let summary = generate_amortization_schedule(100000., 6., 30, 0.).unwrap();
        assert_eq!(
            summary.entries[0].to_string(),
            "month 1, payment $599.55, principal $99.55, interest $500.00, balance $99900.45"
        );
    }
}
