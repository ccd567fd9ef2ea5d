use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use solar_finance::config::FinancingConfig;
use solar_finance::financing::{
    Calendar, ContractService, HomeownerService, InMemoryFinancingStore, MonthCounter,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FinancingService = HomeownerService<InMemoryFinancingStore>;

/// Wires the store, the shared billing calendar, and both services.
pub(crate) fn build_financing_service(config: &FinancingConfig) -> Arc<FinancingService> {
    let store = Arc::new(InMemoryFinancingStore::default());
    let calendar: Arc<dyn Calendar> = Arc::new(MonthCounter::new(config.calendar_start));
    let contracts = Arc::new(ContractService::new(
        store.clone(),
        calendar.clone(),
        config.terms(),
        config.carbon_per_dollar,
    ));
    Arc::new(HomeownerService::new(store, contracts, calendar))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2024-03-01 ").ok(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        let err = parse_date("03/01/2024").expect_err("slash dates rejected");
        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn financing_service_starts_on_configured_month() {
        let config = FinancingConfig {
            calendar_start: NaiveDate::from_ymd_opt(2024, 1, 31).expect("valid date"),
            ..FinancingConfig::default()
        };
        let service = build_financing_service(&config);
        assert!(service.list_homeowners().expect("empty store").is_empty());
        assert_eq!(service.contracts().terms().term_months, 240);
    }
}
