//! Homeowner financing: contracts, investments, monthly payments, and the HTTP surface
//! over them.
//!
//! Every operation reports failures through [`FinancingError`], which carries the one
//! error-kind to status-code table used by the router.

pub mod calendar;
pub mod contracts;
pub mod domain;
pub mod homeowners;
pub mod repository;
pub mod router;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub use calendar::{Calendar, MonthCounter};
pub use contracts::ContractService;
pub use domain::{
    Contract, ContractId, Disbursement, FinancingOption, FinancingTerms,
    FirstPaymentDateUpdate, Homeowner, HomeownerId, Investment, InvestmentId, InvestorId,
    LoadedContract, NewHomeowner, NewInvestment, NewPayment, Payment, PaymentId,
    StorableContract,
};
pub use homeowners::{HomeownerService, OptionDetails, PaymentRunSummary};
pub use repository::{
    ContractRepository, FinancingStore, HomeownerRepository, PaymentLedger, RepositoryError,
};
pub use router::financing_router;
pub use store::InMemoryFinancingStore;
pub use views::{StoredContract, StoredHomeowner, StoredInvestorStat};

/// Error raised by the financing services.
#[derive(Debug, thiserror::Error)]
pub enum FinancingError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid option '{0}'")]
    InvalidOption(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl FinancingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FinancingError::Validation(_) | FinancingError::InvalidOption(_) => {
                StatusCode::BAD_REQUEST
            }
            FinancingError::NotFound(_) => StatusCode::NOT_FOUND,
            FinancingError::Conflict(_) => StatusCode::CONFLICT,
            FinancingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub(crate) fn homeowner_email(email: &str) -> Self {
        FinancingError::NotFound(format!("Homeowner with email {email} not found."))
    }
}

impl From<RepositoryError> for FinancingError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { .. } => FinancingError::NotFound(value.to_string()),
            RepositoryError::Invalid(message) => FinancingError::Validation(message),
            RepositoryError::Conflict(message) => FinancingError::Conflict(message),
            RepositoryError::Unavailable(message) => FinancingError::Unavailable(message),
        }
    }
}

impl IntoResponse for FinancingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "financing request failed");
        }
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
