use crate::error::{MortgageError, Result};
use crate::loan::{check_non_negative, LoanTerms};
use log::{debug, warn};
use std::fmt;

/// Loan terms offered by a typical lender, longest first.
pub const STANDARD_TERMS: [u32; 5] = [30, 20, 15, 10, 5];

/// Down payment as a percentage of the home price. `None` when the price is
/// zero or negative and no percentage exists.
pub fn down_payment_percent(home_price: f64, down_payment: f64) -> Option<f64> {
    if home_price > 0. {
        Some(down_payment / home_price * 100.)
    } else {
        None
    }
}

pub fn down_payment_amount(home_price: f64, percent: f64) -> f64 {
    home_price * (percent / 100.)
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HomePurchase {
    pub home_price: f64,
    pub down_payment: f64,
    pub term_years: u32,
    pub annual_rate_percent: f64,
    pub property_tax_rate_percent: f64,
    pub annual_insurance: f64,
    pub monthly_hoa: f64,
}

impl Default for HomePurchase {
    fn default() -> Self {
        Self {
            home_price: 425000.,
            down_payment: 21250.,
            term_years: 30,
            annual_rate_percent: 5.,
            property_tax_rate_percent: 0.8,
            annual_insurance: 792.,
            monthly_hoa: 0.,
        }
    }
}

impl HomePurchase {
    pub fn with_down_payment_percent(mut self, percent: f64) -> Result<Self> {
        if !(0. ..=100.).contains(&percent) {
            warn!("rejected down payment percent {}", percent);
            return Err(MortgageError::invalid_input(
                "down_payment_percent",
                format!("must be between 0 and 100, got {}", percent),
            ));
        }
        self.down_payment = down_payment_amount(self.home_price, percent);
        Ok(self)
    }

    pub fn down_payment_percent(&self) -> Option<f64> {
        down_payment_percent(self.home_price, self.down_payment)
    }

    pub fn loan_principal(&self) -> f64 {
        self.home_price - self.down_payment
    }

    pub fn loan_terms(&self, extra_monthly_payment: f64) -> Result<LoanTerms> {
        self.validate()?;
        LoanTerms::new(
            self.loan_principal(),
            self.annual_rate_percent,
            self.term_years,
            extra_monthly_payment,
        )
    }

    pub fn monthly_breakdown(&self) -> Result<PaymentBreakdown> {
        let terms = self.loan_terms(0.)?;
        let breakdown = PaymentBreakdown {
            principal_and_interest: terms.monthly_payment(),
            property_tax: self.home_price * (self.property_tax_rate_percent / 100.) / 12.,
            insurance: self.annual_insurance / 12.,
            hoa: self.monthly_hoa,
        };
        debug!("monthly breakdown {:?}, total {}", breakdown, breakdown.total());
        Ok(breakdown)
    }

    fn validate(&self) -> Result<()> {
        check_non_negative("home_price", self.home_price)?;
        check_non_negative("down_payment", self.down_payment)?;
        check_non_negative("property_tax_rate_percent", self.property_tax_rate_percent)?;
        check_non_negative("annual_insurance", self.annual_insurance)?;
        check_non_negative("monthly_hoa", self.monthly_hoa)?;
        if self.down_payment > self.home_price {
            warn!(
                "rejected down payment {} above home price {}",
                self.down_payment, self.home_price
            );
            return Err(MortgageError::invalid_input(
                "down_payment",
                format!(
                    "{} exceeds the home price of {}",
                    self.down_payment, self.home_price
                ),
            ));
        }
        Ok(())
    }
}

/// Monthly cost of owning the home.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaymentBreakdown {
    pub principal_and_interest: f64,
    pub property_tax: f64,
    pub insurance: f64,
    pub hoa: f64,
}

impl PaymentBreakdown {
    pub fn total(&self) -> f64 {
        self.principal_and_interest + self.property_tax + self.insurance + self.hoa
    }

    /// Labelled parts of the payment. HOA fees only appear when there are any.
    pub fn components(&self) -> Vec<(&'static str, f64)> {
        let mut parts = vec![
            ("Principal & Interest", self.principal_and_interest),
            ("Property Tax", self.property_tax),
            ("Homeowner's Insurance", self.insurance),
        ];
        if self.hoa > 0. {
            parts.push(("HOA Fees", self.hoa));
        }
        parts
    }
}

impl fmt::Display for PaymentBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, amount) in self.components() {
            writeln!(f, "{:<22} ${:>10.2}", label, amount)?;
        }
        write!(f, "{:<22} ${:>10.2}", "Total", self.total())
    }
}
