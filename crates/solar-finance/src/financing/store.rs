use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    whole_cents, Contract, ContractId, FirstPaymentDateUpdate, Homeowner, HomeownerId,
    Investment, InvestmentId, InvestorId, LoadedContract, NewHomeowner, NewInvestment,
    NewPayment, Payment, PaymentId, StorableContract,
};
use super::repository::{ContractRepository, HomeownerRepository, PaymentLedger, RepositoryError};

/// Process-local store backing every financing repository trait.
///
/// Rows iterate in id order. Contracts are kept without their investments; relations are
/// joined in when a contract is loaded.
#[derive(Default)]
pub struct InMemoryFinancingStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    homeowners: BTreeMap<HomeownerId, Homeowner>,
    contracts: BTreeMap<ContractId, Contract>,
    investments: Vec<Investment>,
    payments: Vec<Payment>,
    sequences: Sequences,
}

#[derive(Default)]
struct Sequences {
    homeowner: u64,
    contract: u64,
    investment: u64,
    payment: u64,
}

fn next_key(counter: &mut u64, prefix: &str) -> String {
    *counter += 1;
    format!("{prefix}-{:06}", *counter)
}

impl StoreState {
    fn investments_for(&self, contract_id: &ContractId) -> Vec<Investment> {
        self.investments
            .iter()
            .filter(|investment| &investment.contract_id == contract_id)
            .cloned()
            .collect()
    }

    fn load(&self, contract: &Contract) -> Result<LoadedContract, RepositoryError> {
        let homeowner = self
            .homeowners
            .get(&contract.homeowner_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Homeowner", &contract.homeowner_id))?;
        let mut contract = contract.clone();
        contract.investments = self.investments_for(&contract.id);
        Ok(LoadedContract {
            contract,
            homeowner,
        })
    }
}

impl InMemoryFinancingStore {
    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl HomeownerRepository for InMemoryFinancingStore {
    fn homeowners(&self) -> Result<Vec<Homeowner>, RepositoryError> {
        Ok(self.state()?.homeowners.values().cloned().collect())
    }

    fn homeowner(&self, id: &HomeownerId) -> Result<Option<Homeowner>, RepositoryError> {
        Ok(self.state()?.homeowners.get(id).cloned())
    }

    fn homeowner_by_email(&self, email: &str) -> Result<Option<Homeowner>, RepositoryError> {
        Ok(self
            .state()?
            .homeowners
            .values()
            .find(|homeowner| homeowner.email == email)
            .cloned())
    }

    fn insert_homeowner(&self, homeowner: NewHomeowner) -> Result<Homeowner, RepositoryError> {
        let mut state = self.state()?;
        if state
            .homeowners
            .values()
            .any(|existing| existing.email == homeowner.email)
        {
            return Err(RepositoryError::Conflict(format!(
                "Homeowner with email {} already exists.",
                homeowner.email
            )));
        }

        let id = HomeownerId(next_key(&mut state.sequences.homeowner, "ho"));
        let record = Homeowner {
            id: id.clone(),
            name: homeowner.name,
            email: homeowner.email,
            pwd_hash: homeowner.pwd_hash,
            contract_id: None,
        };
        state.homeowners.insert(id, record.clone());
        Ok(record)
    }

    fn attach_contract(
        &self,
        id: &HomeownerId,
        contract_id: &ContractId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.contracts.contains_key(contract_id) {
            return Err(RepositoryError::not_found("Contract", contract_id));
        }
        let homeowner = state
            .homeowners
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("Homeowner", id))?;
        homeowner.contract_id = Some(contract_id.clone());
        Ok(())
    }

    fn delete_homeowner(&self, id: &HomeownerId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .homeowners
            .remove(id)
            .ok_or_else(|| RepositoryError::not_found("Homeowner", id))?;
        state
            .contracts
            .retain(|_, contract| &contract.homeowner_id != id);
        Ok(())
    }
}

impl ContractRepository for InMemoryFinancingStore {
    fn contract(&self, id: &ContractId) -> Result<LoadedContract, RepositoryError> {
        let state = self.state()?;
        let contract = state
            .contracts
            .get(id)
            .ok_or_else(|| RepositoryError::not_found("Contract", id))?;
        state.load(contract)
    }

    fn contracts(
        &self,
        owner: Option<&HomeownerId>,
    ) -> Result<Vec<LoadedContract>, RepositoryError> {
        let state = self.state()?;
        state
            .contracts
            .values()
            .filter(|contract| owner.map_or(true, |owner| &contract.homeowner_id == owner))
            .map(|contract| state.load(contract))
            .collect()
    }

    fn investments_for_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<Investment>, RepositoryError> {
        Ok(self.state()?.investments_for(contract_id))
    }

    fn investments_for_investor(
        &self,
        owner_id: &InvestorId,
    ) -> Result<Vec<Investment>, RepositoryError> {
        Ok(self
            .state()?
            .investments
            .iter()
            .filter(|investment| &investment.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn create_contract(&self, contract: StorableContract) -> Result<Contract, RepositoryError> {
        let mut state = self.state()?;
        if !state.homeowners.contains_key(&contract.homeowner_id) {
            return Err(RepositoryError::not_found(
                "Homeowner",
                &contract.homeowner_id,
            ));
        }
        if state
            .contracts
            .values()
            .any(|existing| existing.homeowner_id == contract.homeowner_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "Homeowner {} already has a contract.",
                contract.homeowner_id
            )));
        }

        let id = ContractId(next_key(&mut state.sequences.contract, "ct"));
        let record = Contract {
            id: id.clone(),
            homeowner_id: contract.homeowner_id,
            sale_amount: contract.sale_amount,
            total_length: contract.length,
            monthly_payment: contract.monthly_payment,
            first_payment_date: None,
            unsold_amount: contract.sale_amount,
            investments: Vec::new(),
        };
        state.contracts.insert(id, record.clone());
        Ok(record)
    }

    fn save_first_payment_date(
        &self,
        update: FirstPaymentDateUpdate,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let contract = state
            .contracts
            .get_mut(&update.contract_id)
            .ok_or_else(|| RepositoryError::not_found("Contract", &update.contract_id))?;
        contract.first_payment_date = Some(update.first_payment_date);
        Ok(())
    }

    fn add_investment(&self, investment: NewInvestment) -> Result<Investment, RepositoryError> {
        let mut state = self.state()?;
        let cents = whole_cents(investment.amount).ok_or_else(|| {
            RepositoryError::Invalid(format!(
                "Investment amount {} is not a whole number of cents.",
                investment.amount
            ))
        })?;
        let contract = state
            .contracts
            .get_mut(&investment.contract_id)
            .ok_or_else(|| RepositoryError::not_found("Contract", &investment.contract_id))?;
        // Unsold capacity is compared in cents, rounded down.
        let unsold_cents = (contract.unsold_amount * 100.0 + 1e-6).floor() as i64;
        if cents > unsold_cents {
            return Err(RepositoryError::Conflict(format!(
                "Investment of {} exceeds the unsold amount {} of contract {}.",
                investment.amount, contract.unsold_amount, contract.id
            )));
        }
        contract.unsold_amount = (unsold_cents - cents) as f64 / 100.0;

        let id = InvestmentId(next_key(&mut state.sequences.investment, "inv"));
        let record = Investment {
            id,
            contract_id: investment.contract_id,
            owner_id: investment.owner_id,
            amount: cents as f64 / 100.0,
        };
        state.investments.push(record.clone());
        Ok(record)
    }

    fn contract_position_in_queue(&self, unsold_amount: f64) -> Result<usize, RepositoryError> {
        Ok(self
            .state()?
            .contracts
            .values()
            .filter(|contract| !contract.is_fully_sold() && contract.unsold_amount < unsold_amount)
            .count())
    }
}

impl PaymentLedger for InMemoryFinancingStore {
    fn record_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let mut state = self.state()?;
        let id = PaymentId(next_key(&mut state.sequences.payment, "pay"));
        let record = Payment {
            id,
            contract_id: payment.contract_id,
            homeowner_id: payment.homeowner_id,
            due_date: payment.due_date,
            amount: payment.amount,
            disbursements: payment.disbursements,
            unsold_share: payment.unsold_share,
            recorded_at: Utc::now(),
        };
        state.payments.push(record.clone());
        Ok(record)
    }

    fn payments_for_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .state()?
            .payments
            .iter()
            .filter(|payment| &payment.contract_id == contract_id)
            .cloned()
            .collect())
    }
}
