use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Contract, ContractId, Homeowner, HomeownerId, Investment};

/// API projection of a contract with its funding progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContract {
    pub id: ContractId,
    pub sale_amount: f64,
    pub total_length: u32,
    pub monthly_payment: f64,
    pub first_payment_date: Option<NaiveDate>,
    pub unsold_amount: f64,
    /// Fraction of the sale amount covered by investments.
    pub funded_fraction: f64,
    /// `None` once the contract is fully sold.
    pub position_in_queue: Option<usize>,
    pub homeowner_id: HomeownerId,
}

impl StoredContract {
    pub fn new(
        contract: &Contract,
        investments: &[Investment],
        position_in_queue: Option<usize>,
    ) -> Self {
        Self {
            id: contract.id.clone(),
            sale_amount: contract.sale_amount,
            total_length: contract.total_length,
            monthly_payment: contract.monthly_payment,
            first_payment_date: contract.first_payment_date,
            unsold_amount: contract.unsold_amount,
            funded_fraction: funded_fraction(contract, investments),
            position_in_queue,
            homeowner_id: contract.homeowner_id.clone(),
        }
    }
}

/// Invested share of the sale amount over the investments that reference `contract`.
/// Zero when the sale amount is zero.
pub fn funded_fraction(contract: &Contract, investments: &[Investment]) -> f64 {
    if contract.sale_amount <= 0.0 {
        return 0.0;
    }
    let invested: f64 = investments
        .iter()
        .filter(|investment| investment.contract_id == contract.id)
        .map(|investment| investment.amount)
        .sum();
    invested / contract.sale_amount
}

/// API projection of a homeowner. The credential hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredHomeowner {
    pub id: HomeownerId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<StoredContract>,
}

impl StoredHomeowner {
    pub fn new(homeowner: &Homeowner, contract: Option<StoredContract>) -> Self {
        Self {
            id: homeowner.id.clone(),
            name: homeowner.name.clone(),
            email: homeowner.email.clone(),
            contract,
        }
    }
}

/// Display-rounded investor totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInvestorStat {
    pub carbon_reduction: f64,
    pub target_rate: f64,
    pub total_portfolio: f64,
}

impl StoredInvestorStat {
    /// Carbon reduction rounds to the nearest 10, the portfolio to the nearest 100.
    pub fn new(carbon_reduction: f64, total_portfolio: f64, target_rate: f64) -> Self {
        Self {
            carbon_reduction: (carbon_reduction / 10.0).round() * 10.0,
            target_rate,
            total_portfolio: (total_portfolio / 100.0).round() * 100.0,
        }
    }
}
