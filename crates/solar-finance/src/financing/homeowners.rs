use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::calendar::Calendar;
use super::contracts::ContractService;
use super::domain::{Contract, FinancingOption, Homeowner, NewHomeowner, Payment};
use super::repository::FinancingStore;
use super::views::{StoredContract, StoredHomeowner};
use super::FinancingError;

/// Package details plus the monthly payment a homeowner would owe for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDetails {
    pub electricity: u32,
    pub contract_size: f64,
    pub monthly_payment: f64,
}

/// Outcome counts of one billing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRunSummary {
    pub attempted: usize,
    pub paid: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Billing month after the run.
    pub current_date: Option<NaiveDate>,
}

/// Homeowner-facing orchestration over the store and the contract service.
pub struct HomeownerService<S> {
    store: Arc<S>,
    contracts: Arc<ContractService<S>>,
    calendar: Arc<dyn Calendar>,
}

impl<S> HomeownerService<S>
where
    S: FinancingStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        contracts: Arc<ContractService<S>>,
        calendar: Arc<dyn Calendar>,
    ) -> Self {
        Self {
            store,
            contracts,
            calendar,
        }
    }

    pub fn contracts(&self) -> &Arc<ContractService<S>> {
        &self.contracts
    }

    pub fn list_homeowners(&self) -> Result<Vec<StoredHomeowner>, FinancingError> {
        self.store
            .homeowners()?
            .iter()
            .map(|homeowner| self.enrich(homeowner))
            .collect()
    }

    pub fn create_homeowner(
        &self,
        input: Option<NewHomeowner>,
    ) -> Result<StoredHomeowner, FinancingError> {
        let input = input
            .ok_or_else(|| FinancingError::Validation("missing user in request body".to_string()))?;
        let homeowner = self.store.insert_homeowner(input)?;
        info!(homeowner_id = %homeowner.id, "homeowner created");
        Ok(StoredHomeowner::new(&homeowner, None))
    }

    pub fn homeowner(&self, email: &str) -> Result<StoredHomeowner, FinancingError> {
        let homeowner = self.find_by_email(email)?;
        self.enrich(&homeowner)
    }

    pub fn delete_homeowner(&self, email: &str) -> Result<(), FinancingError> {
        let homeowner = self.find_by_email(email)?;
        self.store.delete_homeowner(&homeowner.id)?;
        info!(homeowner_id = %homeowner.id, "homeowner deleted");
        Ok(())
    }

    /// Validates `amount` before looking the homeowner up.
    pub fn sign_up_for_financing(
        &self,
        email: &str,
        amount: Option<&Value>,
    ) -> Result<Contract, FinancingError> {
        let amount = parse_amount(amount)?;
        let homeowner = self.find_by_email(email)?;
        if let Some(contract_id) = &homeowner.contract_id {
            return Err(FinancingError::Conflict(format!(
                "Homeowner {} already has contract {contract_id}.",
                homeowner.email
            )));
        }
        self.contracts.create_contract(amount, &homeowner.id)
    }

    /// Contract projection for the sign-up response.
    pub fn stored_contract(&self, contract: &Contract) -> Result<StoredContract, FinancingError> {
        self.contracts.stored_contract(contract)
    }

    pub fn make_payment(&self, email: &str) -> Result<Option<Payment>, FinancingError> {
        self.contracts.make_payment(email)
    }

    /// Attempt one payment per contract concurrently, then advance the calendar once.
    ///
    /// Individual failures are counted and logged; they neither stop the other attempts
    /// nor hold the calendar back.
    pub async fn make_all_payments(&self) -> Result<PaymentRunSummary, FinancingError> {
        let contracts = self.store.contracts(None)?;
        let mut attempts = JoinSet::new();
        for loaded in contracts {
            let service = Arc::clone(&self.contracts);
            let email = loaded.homeowner.email;
            attempts.spawn(async move {
                let outcome = service.make_payment(&email);
                (email, outcome)
            });
        }

        let mut summary = PaymentRunSummary::default();
        while let Some(joined) = attempts.join_next().await {
            summary.attempted += 1;
            match joined {
                Ok((_, Ok(Some(_)))) => summary.paid += 1,
                Ok((_, Ok(None))) => summary.skipped += 1,
                Ok((email, Err(err))) => {
                    warn!(%email, error = %err, "payment attempt failed");
                    summary.failed += 1;
                }
                Err(err) => {
                    warn!(error = %err, "payment task aborted");
                    summary.failed += 1;
                }
            }
        }

        let current_date = self.calendar.add_month();
        summary.current_date = Some(current_date);
        info!(
            attempted = summary.attempted,
            paid = summary.paid,
            skipped = summary.skipped,
            failed = summary.failed,
            %current_date,
            "payment run complete"
        );
        Ok(summary)
    }

    /// Validates `option` before looking the homeowner up.
    pub fn option_details(
        &self,
        option: &str,
        email: &str,
    ) -> Result<OptionDetails, FinancingError> {
        let option: FinancingOption = option.parse()?;
        let homeowner = self.find_by_email(email)?;
        let proposal = self
            .contracts
            .preview_contract(option.contract_size(), &homeowner.id)?;

        Ok(OptionDetails {
            electricity: option.electricity(),
            contract_size: option.contract_size(),
            monthly_payment: proposal.monthly_payment,
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Homeowner, FinancingError> {
        self.store
            .homeowner_by_email(email)?
            .ok_or_else(|| FinancingError::homeowner_email(email))
    }

    fn enrich(&self, homeowner: &Homeowner) -> Result<StoredHomeowner, FinancingError> {
        let contract = match &homeowner.contract_id {
            Some(contract_id) => {
                let loaded = self.store.contract(contract_id)?;
                Some(self.contracts.stored_contract(&loaded.contract)?)
            }
            None => None,
        };
        Ok(StoredHomeowner::new(homeowner, contract))
    }
}

/// Accepts JSON numbers and numeric strings.
fn parse_amount(amount: Option<&Value>) -> Result<f64, FinancingError> {
    let parsed = match amount {
        None | Some(Value::Null) => {
            return Err(FinancingError::Validation("missing amount".to_string()))
        }
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(FinancingError::Validation(format!(
            "amount must be a positive number, got {}",
            amount.map(Value::to_string).unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(Some(&json!(6000))).ok(), Some(6000.0));
        assert_eq!(parse_amount(Some(&json!(" 7500.5 "))).ok(), Some(7500.5));
    }

    #[test]
    fn parse_amount_rejects_missing_and_malformed_values() {
        for value in [None, Some(json!(null)), Some(json!("abc")), Some(json!(0)), Some(json!(true))] {
            match parse_amount(value.as_ref()) {
                Err(FinancingError::Validation(_)) => {}
                other => panic!("expected validation error for {value:?}, got {other:?}"),
            }
        }
    }
}
