use std::sync::Arc;

use tracing::{debug, info};

use super::calendar::{shift_months, Calendar};
use super::domain::{
    round_cents, whole_cents, Contract, ContractId, Disbursement, FinancingTerms,
    FirstPaymentDateUpdate, HomeownerId, Investment, InvestorId, LoadedContract, NewInvestment,
    NewPayment, Payment, StorableContract,
};
use super::repository::FinancingStore;
use super::views::{StoredContract, StoredInvestorStat};
use super::FinancingError;

/// Contract sizing, payment stepping, and investment purchases.
pub struct ContractService<S> {
    store: Arc<S>,
    calendar: Arc<dyn Calendar>,
    terms: FinancingTerms,
    carbon_per_dollar: f64,
}

impl<S> ContractService<S>
where
    S: FinancingStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        calendar: Arc<dyn Calendar>,
        terms: FinancingTerms,
        carbon_per_dollar: f64,
    ) -> Self {
        Self {
            store,
            calendar,
            terms,
            carbon_per_dollar,
        }
    }

    pub fn terms(&self) -> FinancingTerms {
        self.terms
    }

    /// Size a contract for `amount` without storing anything.
    pub fn preview_contract(
        &self,
        amount: f64,
        homeowner_id: &HomeownerId,
    ) -> Result<StorableContract, FinancingError> {
        validate_amount(amount)?;
        self.store
            .homeowner(homeowner_id)?
            .ok_or_else(|| {
                FinancingError::NotFound(format!("Homeowner with id {homeowner_id} not found."))
            })?;

        Ok(StorableContract {
            homeowner_id: homeowner_id.clone(),
            sale_amount: amount,
            length: self.terms.term_months,
            monthly_payment: self.terms.monthly_payment(amount),
        })
    }

    /// Store a contract, link it to the homeowner, and schedule the first payment one
    /// billing month out.
    pub fn create_contract(
        &self,
        amount: f64,
        homeowner_id: &HomeownerId,
    ) -> Result<Contract, FinancingError> {
        let proposal = self.preview_contract(amount, homeowner_id)?;
        let mut contract = self.store.create_contract(proposal)?;
        self.store.attach_contract(homeowner_id, &contract.id)?;

        let first_payment_date = shift_months(self.calendar.current_date(), 1);
        self.store.save_first_payment_date(FirstPaymentDateUpdate {
            contract_id: contract.id.clone(),
            first_payment_date,
        })?;
        contract.first_payment_date = Some(first_payment_date);

        info!(
            contract_id = %contract.id,
            homeowner_id = %homeowner_id,
            sale_amount = contract.sale_amount,
            monthly_payment = contract.monthly_payment,
            "contract created"
        );
        Ok(contract)
    }

    /// Apply the homeowner's next payment if one is due.
    ///
    /// Returns `Ok(None)` when nothing is due: no contract, no schedule, a first-payment
    /// date after the current billing month, or a fully repaid contract.
    pub fn make_payment(&self, email: &str) -> Result<Option<Payment>, FinancingError> {
        let homeowner = self
            .store
            .homeowner_by_email(email)?
            .ok_or_else(|| FinancingError::homeowner_email(email))?;

        let Some(contract_id) = &homeowner.contract_id else {
            debug!(%email, "no contract, no payment due");
            return Ok(None);
        };
        let LoadedContract { contract, .. } = self.store.contract(contract_id)?;

        let Some(due_date) = contract.first_payment_date else {
            return Ok(None);
        };
        if due_date > self.calendar.current_date() {
            return Ok(None);
        }

        let made = self.store.payments_for_contract(&contract.id)?.len();
        if made >= contract.total_length as usize {
            debug!(contract_id = %contract.id, "contract fully repaid");
            return Ok(None);
        }

        let (disbursements, unsold_share) = disburse(&contract);
        let payment = self.store.record_payment(NewPayment {
            contract_id: contract.id.clone(),
            homeowner_id: homeowner.id.clone(),
            due_date,
            amount: contract.monthly_payment,
            disbursements,
            unsold_share,
        })?;

        self.store.save_first_payment_date(FirstPaymentDateUpdate {
            contract_id: contract.id.clone(),
            first_payment_date: shift_months(due_date, 1),
        })?;

        info!(
            contract_id = %contract.id,
            payment_id = %payment.id,
            %due_date,
            amount = payment.amount,
            number = made + 1,
            "payment applied"
        );
        Ok(Some(payment))
    }

    /// Buy `amount` of a contract's unsold capacity for an investor.
    pub fn invest(
        &self,
        contract_id: &ContractId,
        owner_id: InvestorId,
        amount: f64,
    ) -> Result<Investment, FinancingError> {
        validate_amount(amount)?;
        let investment = self.store.add_investment(NewInvestment {
            contract_id: contract_id.clone(),
            owner_id,
            amount,
        })?;

        info!(
            contract_id = %contract_id,
            investment_id = %investment.id,
            owner_id = %investment.owner_id,
            amount,
            "investment recorded"
        );
        Ok(investment)
    }

    /// Projection of a contract with its funding progress and queue position.
    pub fn stored_contract(&self, contract: &Contract) -> Result<StoredContract, FinancingError> {
        let investments = self.store.investments_for_contract(&contract.id)?;
        let position = if contract.is_fully_sold() {
            None
        } else {
            Some(
                self.store
                    .contract_position_in_queue(contract.unsold_amount)?,
            )
        };
        Ok(StoredContract::new(contract, &investments, position))
    }

    pub fn contract(&self, contract_id: &ContractId) -> Result<StoredContract, FinancingError> {
        let loaded = self.store.contract(contract_id)?;
        self.stored_contract(&loaded.contract)
    }

    pub fn investor_stats(&self, owner_id: &InvestorId) -> Result<StoredInvestorStat, FinancingError> {
        let portfolio: f64 = self
            .store
            .investments_for_investor(owner_id)?
            .iter()
            .map(|investment| investment.amount)
            .sum();
        Ok(StoredInvestorStat::new(
            portfolio * self.carbon_per_dollar,
            portfolio,
            self.terms.annual_rate,
        ))
    }
}

/// Split a monthly payment across the contract's investments by ownership share.
fn disburse(contract: &Contract) -> (Vec<Disbursement>, f64) {
    if contract.sale_amount <= 0.0 {
        return (Vec::new(), contract.monthly_payment);
    }

    let disbursements: Vec<Disbursement> = contract
        .investments
        .iter()
        .filter(|investment| investment.contract_id == contract.id)
        .map(|investment| Disbursement {
            investment_id: investment.id.clone(),
            owner_id: investment.owner_id.clone(),
            amount: round_cents(
                contract.monthly_payment * investment.amount / contract.sale_amount,
            ),
        })
        .collect();
    let paid_out: f64 = disbursements.iter().map(|entry| entry.amount).sum();
    let unsold_share = round_cents(contract.monthly_payment - paid_out).max(0.0);
    (disbursements, unsold_share)
}

fn validate_amount(amount: f64) -> Result<(), FinancingError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(FinancingError::Validation(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    if whole_cents(amount).is_none() {
        return Err(FinancingError::Validation(format!(
            "amount must be a whole number of cents, got {amount}"
        )));
    }
    Ok(())
}
