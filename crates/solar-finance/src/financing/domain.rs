use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::FinancingError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a persisted homeowner.
    HomeownerId
);
string_id!(
    /// Identifier of a persisted financing contract.
    ContractId
);
string_id!(InvestmentId);
string_id!(
    /// Investor owning one or more investments. Investors are not stored here,
    /// only referenced by the ledger.
    InvestorId
);
string_id!(PaymentId);

/// Persisted homeowner with its optional contract back-link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homeowner {
    pub id: HomeownerId,
    pub name: String,
    pub email: String,
    pub pwd_hash: String,
    pub contract_id: Option<ContractId>,
}

/// Sign-up payload for a homeowner that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHomeowner {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub pwd_hash: String,
}

/// Financing contract as held by the store, investments included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub homeowner_id: HomeownerId,
    pub sale_amount: f64,
    pub total_length: u32,
    pub monthly_payment: f64,
    /// Date the next payment falls due. `None` until payments are scheduled.
    pub first_payment_date: Option<NaiveDate>,
    pub unsold_amount: f64,
    pub investments: Vec<Investment>,
}

impl Contract {
    pub fn is_fully_sold(&self) -> bool {
        self.unsold_amount <= 0.0
    }

    /// The only contract mutation the store persists after creation.
    pub fn first_payment_date_update(&self) -> Option<FirstPaymentDateUpdate> {
        self.first_payment_date.map(|date| FirstPaymentDateUpdate {
            contract_id: self.id.clone(),
            first_payment_date: date,
        })
    }
}

/// Contract together with the homeowner it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedContract {
    pub contract: Contract,
    pub homeowner: Homeowner,
}

/// Contract values computed ahead of persistence. Also the shape returned by a preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorableContract {
    pub homeowner_id: HomeownerId,
    pub sale_amount: f64,
    pub length: u32,
    pub monthly_payment: f64,
}

/// Narrow update: moves a contract's first-payment date and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstPaymentDateUpdate {
    pub contract_id: ContractId,
    pub first_payment_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: InvestmentId,
    pub contract_id: ContractId,
    pub owner_id: InvestorId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub contract_id: ContractId,
    pub owner_id: InvestorId,
    pub amount: f64,
}

/// Share of a monthly payment routed to one investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disbursement {
    pub investment_id: InvestmentId,
    pub owner_id: InvestorId,
    pub amount: f64,
}

/// Ledger entry for one applied monthly payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub contract_id: ContractId,
    pub homeowner_id: HomeownerId,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub disbursements: Vec<Disbursement>,
    /// Portion of the payment attributable to capacity no investor holds yet.
    pub unsold_share: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub contract_id: ContractId,
    pub homeowner_id: HomeownerId,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub disbursements: Vec<Disbursement>,
    pub unsold_share: f64,
}

/// Length and pricing applied to every new contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinancingTerms {
    pub term_months: u32,
    pub annual_rate: f64,
}

impl FinancingTerms {
    /// Level annuity payment over the full term, in cents.
    pub fn monthly_payment(&self, sale_amount: f64) -> f64 {
        let months = f64::from(self.term_months.max(1));
        let rate = self.annual_rate / 12.0;
        let payment = if rate > 0.0 {
            sale_amount * rate / (1.0 - (1.0 + rate).powf(-months))
        } else {
            sale_amount / months
        };
        round_cents(payment)
    }
}

/// Fixed installation packages offered to homeowners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancingOption {
    Starter,
    Standard,
    Premium,
}

impl FinancingOption {
    pub const fn contract_size(self) -> f64 {
        match self {
            Self::Starter => 6000.0,
            Self::Standard => 10000.0,
            Self::Premium => 15000.0,
        }
    }

    /// Monthly electricity allowance that comes with the package.
    pub const fn electricity(self) -> u32 {
        match self {
            Self::Starter => 60,
            Self::Standard => 100,
            Self::Premium => 150,
        }
    }
}

impl FromStr for FinancingOption {
    type Err = FinancingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "0" => Ok(Self::Starter),
            "1" => Ok(Self::Standard),
            "2" => Ok(Self::Premium),
            other => Err(FinancingError::InvalidOption(other.to_string())),
        }
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Exact cent count of `amount`, or `None` when it carries a fraction of a cent.
pub(crate) fn whole_cents(amount: f64) -> Option<i64> {
    let scaled = amount * 100.0;
    let cents = scaled.round();
    if !scaled.is_finite() || (scaled - cents).abs() > 1e-6 {
        return None;
    }
    Some(cents as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_spreads_sale_amount_evenly() {
        let terms = FinancingTerms {
            term_months: 120,
            annual_rate: 0.0,
        };
        assert_eq!(terms.monthly_payment(12000.0), 100.0);
    }

    #[test]
    fn annuity_payment_matches_reference_value() {
        let terms = FinancingTerms {
            term_months: 240,
            annual_rate: 0.04,
        };
        // 10k over 20 years at 4% APR.
        assert_eq!(terms.monthly_payment(10000.0), 60.6);
    }

    #[test]
    fn whole_cents_rejects_fractions_of_a_cent() {
        assert_eq!(whole_cents(50.0), Some(5000));
        assert_eq!(whole_cents(0.29), Some(29));
        assert_eq!(whole_cents(50.005), None);
        assert_eq!(whole_cents(0.004), None);
        assert_eq!(whole_cents(f64::INFINITY), None);
    }

    #[test]
    fn options_parse_from_path_segments() {
        assert_eq!("1".parse::<FinancingOption>().ok(), Some(FinancingOption::Standard));
        assert_eq!(FinancingOption::Premium.contract_size(), 15000.0);
        assert_eq!(FinancingOption::Starter.electricity(), 60);
        match "3".parse::<FinancingOption>() {
            Err(FinancingError::InvalidOption(raw)) => assert_eq!(raw, "3"),
            other => panic!("expected invalid option, got {other:?}"),
        }
    }
}
