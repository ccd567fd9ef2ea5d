use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::financing::calendar::{Calendar, MonthCounter};
use crate::financing::domain::{
    Contract, ContractId, FinancingTerms, FirstPaymentDateUpdate, Homeowner, HomeownerId,
    Investment, InvestorId, LoadedContract, NewHomeowner, NewInvestment, NewPayment, Payment,
    StorableContract,
};
use crate::financing::repository::{
    ContractRepository, HomeownerRepository, PaymentLedger, RepositoryError,
};
use crate::financing::{ContractService, HomeownerService, InMemoryFinancingStore};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn calendar_start() -> NaiveDate {
    date(2020, 1, 1)
}

/// Ten years at zero interest keeps payment figures round.
pub(super) fn terms() -> FinancingTerms {
    FinancingTerms {
        term_months: 120,
        annual_rate: 0.0,
    }
}

pub(super) const CARBON_PER_DOLLAR: f64 = 0.5;

pub(super) fn new_homeowner(name: &str, email: &str) -> NewHomeowner {
    NewHomeowner {
        name: name.to_string(),
        email: email.to_string(),
        pwd_hash: format!("hash-{name}"),
    }
}

pub(super) fn storable(homeowner_id: &HomeownerId, sale_amount: f64) -> StorableContract {
    StorableContract {
        homeowner_id: homeowner_id.clone(),
        sale_amount,
        length: 120,
        monthly_payment: sale_amount / 120.0,
    }
}

pub(super) fn investor(name: &str) -> InvestorId {
    InvestorId(name.to_string())
}

pub(super) type Service = HomeownerService<InMemoryFinancingStore>;

pub(super) fn build_service_with_terms(
    terms: FinancingTerms,
) -> (Arc<Service>, Arc<InMemoryFinancingStore>, Arc<MonthCounter>) {
    let store = Arc::new(InMemoryFinancingStore::default());
    let calendar = Arc::new(MonthCounter::new(calendar_start()));
    let shared_calendar: Arc<dyn Calendar> = calendar.clone();
    let contracts = Arc::new(ContractService::new(
        store.clone(),
        shared_calendar.clone(),
        terms,
        CARBON_PER_DOLLAR,
    ));
    let service = Arc::new(HomeownerService::new(
        store.clone(),
        contracts,
        shared_calendar,
    ));
    (service, store, calendar)
}

pub(super) fn build_service() -> (Arc<Service>, Arc<InMemoryFinancingStore>, Arc<MonthCounter>) {
    build_service_with_terms(terms())
}

/// Stores a homeowner and signs them up for `amount` through the service.
pub(super) fn signed_up(service: &Service, name: &str, email: &str, amount: f64) -> Contract {
    service
        .create_homeowner(Some(new_homeowner(name, email)))
        .expect("homeowner stored");
    service
        .sign_up_for_financing(email, Some(&serde_json::json!(amount)))
        .expect("sign-up succeeds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails as if the database were offline.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl HomeownerRepository for UnavailableStore {
    fn homeowners(&self) -> Result<Vec<Homeowner>, RepositoryError> {
        offline()
    }

    fn homeowner(&self, _id: &HomeownerId) -> Result<Option<Homeowner>, RepositoryError> {
        offline()
    }

    fn homeowner_by_email(&self, _email: &str) -> Result<Option<Homeowner>, RepositoryError> {
        offline()
    }

    fn insert_homeowner(&self, _homeowner: NewHomeowner) -> Result<Homeowner, RepositoryError> {
        offline()
    }

    fn attach_contract(
        &self,
        _id: &HomeownerId,
        _contract_id: &ContractId,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_homeowner(&self, _id: &HomeownerId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl ContractRepository for UnavailableStore {
    fn contract(&self, _id: &ContractId) -> Result<LoadedContract, RepositoryError> {
        offline()
    }

    fn contracts(
        &self,
        _owner: Option<&HomeownerId>,
    ) -> Result<Vec<LoadedContract>, RepositoryError> {
        offline()
    }

    fn investments_for_contract(
        &self,
        _contract_id: &ContractId,
    ) -> Result<Vec<Investment>, RepositoryError> {
        offline()
    }

    fn investments_for_investor(
        &self,
        _owner_id: &InvestorId,
    ) -> Result<Vec<Investment>, RepositoryError> {
        offline()
    }

    fn create_contract(&self, _contract: StorableContract) -> Result<Contract, RepositoryError> {
        offline()
    }

    fn save_first_payment_date(
        &self,
        _update: FirstPaymentDateUpdate,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn add_investment(&self, _investment: NewInvestment) -> Result<Investment, RepositoryError> {
        offline()
    }

    fn contract_position_in_queue(&self, _unsold_amount: f64) -> Result<usize, RepositoryError> {
        offline()
    }
}

impl PaymentLedger for UnavailableStore {
    fn record_payment(&self, _payment: NewPayment) -> Result<Payment, RepositoryError> {
        offline()
    }

    fn payments_for_contract(
        &self,
        _contract_id: &ContractId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        offline()
    }
}

pub(super) fn unavailable_service() -> Arc<HomeownerService<UnavailableStore>> {
    let store = Arc::new(UnavailableStore);
    let calendar: Arc<dyn Calendar> = Arc::new(MonthCounter::new(calendar_start()));
    let contracts = Arc::new(ContractService::new(
        store.clone(),
        calendar.clone(),
        terms(),
        CARBON_PER_DOLLAR,
    ));
    Arc::new(HomeownerService::new(store, contracts, calendar))
}
