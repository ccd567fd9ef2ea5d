use crate::infra::parse_date;
use chrono::{Months, NaiveDate};
use clap::Args;
use serde::Serialize;
use solar_finance::config::AppConfig;
use solar_finance::error::AppError;
use solar_finance::financing::{FinancingError, FinancingOption, FinancingTerms};

#[derive(Args, Debug, Default)]
pub(crate) struct QuoteArgs {
    /// Price a custom sale amount instead of the standard packages
    #[arg(long)]
    pub(crate) amount: Option<f64>,
    /// Sign-up month (YYYY-MM-DD). Defaults to the configured calendar start.
    #[arg(long, value_parser = parse_date)]
    pub(crate) signup: Option<NaiveDate>,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteLine {
    pub(crate) label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) electricity: Option<u32>,
    pub(crate) contract_size: f64,
    pub(crate) monthly_payment: f64,
    pub(crate) total_repaid: f64,
}

const PACKAGES: [(FinancingOption, &str); 3] = [
    (FinancingOption::Starter, "0 (starter)"),
    (FinancingOption::Standard, "1 (standard)"),
    (FinancingOption::Premium, "2 (premium)"),
];

pub(crate) fn quote_lines(terms: FinancingTerms, amount: Option<f64>) -> Vec<QuoteLine> {
    let line = |label: String, electricity: Option<u32>, contract_size: f64| {
        let monthly_payment = terms.monthly_payment(contract_size);
        QuoteLine {
            label,
            electricity,
            contract_size,
            monthly_payment,
            total_repaid: (monthly_payment * f64::from(terms.term_months) * 100.0).round()
                / 100.0,
        }
    };

    match amount {
        Some(amount) => vec![line("custom".to_string(), None, amount)],
        None => PACKAGES
            .iter()
            .map(|(option, label)| {
                line(
                    (*label).to_string(),
                    Some(option.electricity()),
                    option.contract_size(),
                )
            })
            .collect(),
    }
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        amount,
        signup,
        json,
    } = args;

    if let Some(amount) = amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FinancingError::Validation(format!(
                "amount must be a positive number, got {amount}"
            ))
            .into());
        }
    }

    let config = AppConfig::load()?;
    let terms = config.financing.terms();
    let signup = signup.unwrap_or(config.financing.calendar_start);
    let first_payment = signup.checked_add_months(Months::new(1));
    let lines = quote_lines(terms, amount);

    if json {
        let payload = serde_json::json!({
            "termMonths": terms.term_months,
            "annualRate": terms.annual_rate,
            "firstPaymentDate": first_payment,
            "quotes": lines,
        });
        let rendered = serde_json::to_string_pretty(&payload).map_err(std::io::Error::from)?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Financing quote: {} months at {:.2}% APR",
        terms.term_months,
        terms.annual_rate * 100.0
    );
    match first_payment {
        Some(date) => println!("Sign-up {signup}, first payment due {date}"),
        None => println!("Sign-up {signup}, first payment date out of range"),
    }
    for line in &lines {
        let electricity = line
            .electricity
            .map(|kwh| format!("{kwh} kWh"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<14} {:>8} {:>10.2} -> {:>8.2}/month ({:.2} total)",
            line.label, electricity, line.contract_size, line.monthly_payment, line.total_repaid
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_quotes_follow_configured_terms() {
        let terms = FinancingTerms {
            term_months: 120,
            annual_rate: 0.0,
        };
        let lines = quote_lines(terms, None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].electricity, Some(60));
        assert_eq!(lines[0].monthly_payment, 50.0);
        assert_eq!(lines[2].contract_size, 15000.0);
        assert_eq!(lines[2].monthly_payment, 125.0);
        assert_eq!(lines[2].total_repaid, 15000.0);
    }

    #[test]
    fn custom_amount_replaces_packages() {
        let terms = FinancingTerms {
            term_months: 240,
            annual_rate: 0.04,
        };
        let lines = quote_lines(terms, Some(10000.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].label, "custom");
        assert_eq!(lines[0].electricity, None);
        assert_eq!(lines[0].monthly_payment, 60.6);
        assert_eq!(lines[0].total_repaid, 14544.0);
    }
}
