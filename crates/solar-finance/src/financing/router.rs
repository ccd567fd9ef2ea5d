use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ContractId, InvestorId, NewHomeowner, Payment};
use super::homeowners::{HomeownerService, OptionDetails, PaymentRunSummary};
use super::repository::FinancingStore;
use super::views::{StoredContract, StoredHomeowner, StoredInvestorStat};
use super::FinancingError;

type SharedService<S> = State<Arc<HomeownerService<S>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateHomeownerRequest {
    #[serde(default)]
    pub(crate) user: Option<NewHomeowner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpRequest {
    #[serde(default)]
    pub(crate) amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvestRequest {
    pub(crate) owner_id: InvestorId,
    pub(crate) amount: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct HomeownerList {
    pub(crate) users: Vec<StoredHomeowner>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContractEnvelope {
    pub(crate) contract: StoredContract,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaymentEnvelope {
    pub(crate) payment: Payment,
}

/// Router builder exposing the homeowner, payment, contract, and investor endpoints.
pub fn financing_router<S>(service: Arc<HomeownerService<S>>) -> Router
where
    S: FinancingStore + 'static,
{
    Router::new()
        .route(
            "/homeowners",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/homeowners/:email",
            get(homeowner_handler::<S>).delete(delete_handler::<S>),
        )
        .route("/homeowners/:email/signup", post(sign_up_handler::<S>))
        .route("/homeowners/:email/payment", post(payment_handler::<S>))
        .route(
            "/homeowners/:email/options/:option",
            get(option_handler::<S>),
        )
        .route("/payments/run", post(payment_run_handler::<S>))
        .route("/contracts/:contract_id", get(contract_handler::<S>))
        .route(
            "/contracts/:contract_id/investments",
            post(invest_handler::<S>),
        )
        .route(
            "/investors/:investor_id/stats",
            get(investor_stats_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<S>(
    State(service): SharedService<S>,
) -> Result<Json<HomeownerList>, FinancingError>
where
    S: FinancingStore + 'static,
{
    let users = service.list_homeowners()?;
    Ok(Json(HomeownerList { users }))
}

pub(crate) async fn create_handler<S>(
    State(service): SharedService<S>,
    Json(request): Json<CreateHomeownerRequest>,
) -> Result<(StatusCode, Json<StoredHomeowner>), FinancingError>
where
    S: FinancingStore + 'static,
{
    let stored = service.create_homeowner(request.user)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(crate) async fn homeowner_handler<S>(
    State(service): SharedService<S>,
    Path(email): Path<String>,
) -> Result<Json<StoredHomeowner>, FinancingError>
where
    S: FinancingStore + 'static,
{
    Ok(Json(service.homeowner(&email)?))
}

pub(crate) async fn delete_handler<S>(
    State(service): SharedService<S>,
    Path(email): Path<String>,
) -> Result<StatusCode, FinancingError>
where
    S: FinancingStore + 'static,
{
    service.delete_homeowner(&email)?;
    Ok(StatusCode::OK)
}

pub(crate) async fn sign_up_handler<S>(
    State(service): SharedService<S>,
    Path(email): Path<String>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<ContractEnvelope>, FinancingError>
where
    S: FinancingStore + 'static,
{
    let contract = service.sign_up_for_financing(&email, request.amount.as_ref())?;
    let contract = service.stored_contract(&contract)?;
    Ok(Json(ContractEnvelope { contract }))
}

/// 203 with an empty body when no payment is due.
pub(crate) async fn payment_handler<S>(
    State(service): SharedService<S>,
    Path(email): Path<String>,
) -> Result<Response, FinancingError>
where
    S: FinancingStore + 'static,
{
    let response = match service.make_payment(&email)? {
        Some(payment) => (StatusCode::OK, Json(PaymentEnvelope { payment })).into_response(),
        None => StatusCode::NON_AUTHORITATIVE_INFORMATION.into_response(),
    };
    Ok(response)
}

pub(crate) async fn payment_run_handler<S>(
    State(service): SharedService<S>,
) -> Result<Json<PaymentRunSummary>, FinancingError>
where
    S: FinancingStore + 'static,
{
    Ok(Json(service.make_all_payments().await?))
}

pub(crate) async fn option_handler<S>(
    State(service): SharedService<S>,
    Path((email, option)): Path<(String, String)>,
) -> Result<Json<OptionDetails>, FinancingError>
where
    S: FinancingStore + 'static,
{
    Ok(Json(service.option_details(&option, &email)?))
}

pub(crate) async fn contract_handler<S>(
    State(service): SharedService<S>,
    Path(contract_id): Path<String>,
) -> Result<Json<StoredContract>, FinancingError>
where
    S: FinancingStore + 'static,
{
    let contract = service.contracts().contract(&ContractId(contract_id))?;
    Ok(Json(contract))
}

pub(crate) async fn invest_handler<S>(
    State(service): SharedService<S>,
    Path(contract_id): Path<String>,
    Json(request): Json<InvestRequest>,
) -> Result<Response, FinancingError>
where
    S: FinancingStore + 'static,
{
    let investment = service.contracts().invest(
        &ContractId(contract_id),
        request.owner_id,
        request.amount,
    )?;
    Ok((StatusCode::CREATED, Json(investment)).into_response())
}

pub(crate) async fn investor_stats_handler<S>(
    State(service): SharedService<S>,
    Path(investor_id): Path<String>,
) -> Result<Json<StoredInvestorStat>, FinancingError>
where
    S: FinancingStore + 'static,
{
    let stats = service.contracts().investor_stats(&InvestorId(investor_id))?;
    Ok(Json(stats))
}
