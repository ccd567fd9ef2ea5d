use super::domain::{
    Contract, ContractId, FirstPaymentDateUpdate, Homeowner, HomeownerId, Investment,
    InvestorId, LoadedContract, NewHomeowner, NewInvestment, NewPayment, Payment,
    StorableContract,
};

/// Homeowner persistence.
pub trait HomeownerRepository: Send + Sync {
    fn homeowners(&self) -> Result<Vec<Homeowner>, RepositoryError>;
    fn homeowner(&self, id: &HomeownerId) -> Result<Option<Homeowner>, RepositoryError>;
    fn homeowner_by_email(&self, email: &str) -> Result<Option<Homeowner>, RepositoryError>;
    fn insert_homeowner(&self, homeowner: NewHomeowner) -> Result<Homeowner, RepositoryError>;
    /// Persist the homeowner side of the homeowner/contract link.
    fn attach_contract(
        &self,
        id: &HomeownerId,
        contract_id: &ContractId,
    ) -> Result<(), RepositoryError>;
    /// Removes the homeowner and the contract it owns.
    fn delete_homeowner(&self, id: &HomeownerId) -> Result<(), RepositoryError>;
}

/// Contract and investment data access.
pub trait ContractRepository: Send + Sync {
    /// Contract with its homeowner and investments, or `NotFound`.
    fn contract(&self, id: &ContractId) -> Result<LoadedContract, RepositoryError>;
    /// All contracts, optionally restricted to one homeowner.
    fn contracts(&self, owner: Option<&HomeownerId>)
        -> Result<Vec<LoadedContract>, RepositoryError>;
    fn investments_for_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<Investment>, RepositoryError>;
    fn investments_for_investor(
        &self,
        owner_id: &InvestorId,
    ) -> Result<Vec<Investment>, RepositoryError>;
    /// Stores a new contract with no investments. Leaves the homeowner record untouched.
    /// Fails with `Conflict` when the homeowner already owns a contract.
    fn create_contract(&self, contract: StorableContract) -> Result<Contract, RepositoryError>;
    fn save_first_payment_date(
        &self,
        update: FirstPaymentDateUpdate,
    ) -> Result<(), RepositoryError>;
    /// Records an investment and reduces the contract's unsold amount by the same value.
    /// Fails with `Invalid` for amounts that are not whole cents and with `Conflict` when
    /// the amount exceeds what is still unsold.
    fn add_investment(&self, investment: NewInvestment) -> Result<Investment, RepositoryError>;
    /// Zero-based rank of `unsold_amount` among contracts that still have unsold capacity,
    /// smallest remaining capacity first.
    fn contract_position_in_queue(&self, unsold_amount: f64) -> Result<usize, RepositoryError>;
}

/// Append-only record of applied payments.
pub trait PaymentLedger: Send + Sync {
    fn record_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;
    fn payments_for_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<Payment>, RepositoryError>;
}

/// Everything the financing services need from storage.
pub trait FinancingStore: HomeownerRepository + ContractRepository + PaymentLedger {}

impl<T> FinancingStore for T where T: HomeownerRepository + ContractRepository + PaymentLedger {}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} with id {id} not found.")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
