use crate::infra::{
    load_criteria_catalog, load_overlay, load_rate_catalog, InMemoryQuoteRepository,
};
use chrono::NaiveDate;
use clap::Args;
use quote_engine::config::SourceConfig;
use quote_engine::error::AppError;
use quote_engine::quoting::{
    CalculatedRate, LoanParams, LoanType, QuoteRecord, QuoteRequest, QuoteService,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Rate sheet CSV (defaults to the built-in sample sheet)
    #[arg(long)]
    pub(crate) rates_csv: Option<PathBuf>,
    /// Criteria CSV (defaults to the built-in sample set)
    #[arg(long)]
    pub(crate) criteria_csv: Option<PathBuf>,
    /// Pricing overlay JSON (defaults to the hardcoded overlay)
    #[arg(long)]
    pub(crate) overlay_json: Option<PathBuf>,
    /// Product scope for the BTL pass
    #[arg(long, default_value = "Residential")]
    pub(crate) scope: String,
    /// Product type for the BTL pass
    #[arg(long, default_value = "2yr Fix")]
    pub(crate) product_type: String,
    /// Property value used by both passes
    #[arg(long, default_value_t = 1_200_000.0)]
    pub(crate) property_value: f64,
    /// Monthly rent used by both passes
    #[arg(long, default_value_t = 4_500.0)]
    pub(crate) monthly_rent: f64,
    /// Gross loan for the bridging pass
    #[arg(long, default_value_t = 400_000.0)]
    pub(crate) bridging_gross: f64,
    /// Reference date for rate validity (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let sources = SourceConfig {
        rates_csv: args.rates_csv.clone(),
        criteria_csv: args.criteria_csv.clone(),
        overlay_json: args.overlay_json.clone(),
    };

    let catalog = load_rate_catalog(&sources)?;
    let criteria = load_criteria_catalog(&sources)?;
    let overlay = load_overlay(&sources);

    let repository = Arc::new(InMemoryQuoteRepository::default());
    let service = QuoteService::new(repository, catalog, criteria, overlay);

    let btl_params = LoanParams {
        property_value: Some(args.property_value),
        monthly_rent: Some(args.monthly_rent),
        loan_type: LoanType::MaxGross,
        product_scope: args.scope.clone(),
        product_type: args.product_type.clone(),
        ..LoanParams::default()
    };
    let btl = service.quote_btl(QuoteRequest {
        params: btl_params,
        answers: BTreeMap::new(),
        today: args.today,
        ..QuoteRequest::default()
    })?;
    render_quote("BTL", &btl);

    let bridging_params = LoanParams {
        property_value: Some(args.property_value),
        monthly_rent: Some(args.monthly_rent),
        specific_gross_loan: Some(args.bridging_gross),
        product_scope: args.scope.clone(),
        ..LoanParams::default()
    };
    let bridging = service.quote_bridging(QuoteRequest {
        params: bridging_params,
        answers: BTreeMap::new(),
        today: args.today,
        ..QuoteRequest::default()
    })?;
    render_quote("Bridging", &bridging);

    Ok(())
}

fn render_quote(heading: &str, record: &QuoteRecord) {
    let summary = record.summary_view();
    println!();
    println!(
        "== {heading} quote {} (tier {}, {} product(s), max LTV {:.0}%)",
        summary.reference.0, summary.tier, summary.product_count, record.max_available_ltv
    );
    if record.results.is_empty() {
        println!("   no eligible products for the current selection");
        return;
    }
    for rate in &record.results {
        render_rate(rate);
    }
}

fn render_rate(rate: &CalculatedRate) {
    println!(
        "   {} @ {} (fee {})",
        rate.product_name,
        rate.rate_text,
        fmt_percent(rate.product_fee_percent)
    );
    println!(
        "     gross {} | net {} | LTV {} | ICR {}",
        fmt_money(rate.gross_loan),
        fmt_money(rate.net_loan),
        fmt_percent(rate.ltv),
        fmt_percent(rate.icr)
    );
    println!(
        "     product fee {} | admin {} | commission {} ({})",
        fmt_money(rate.product_fee_amount),
        fmt_money(rate.admin_fee),
        fmt_money(rate.broker_commission_amount),
        fmt_percent(rate.broker_commission_percent)
    );
}

fn fmt_money(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("£{value:.2}"),
        None => "—".to_string(),
    }
}

fn fmt_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}%"),
        None => "—".to_string(),
    }
}
