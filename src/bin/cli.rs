use anyhow::Result;
use colored::*;
use nport::{
    core::{config::NportConfig, service::FundHoldings},
    edgar::FilingIndex,
    DocumentCache, EdgarClient, HoldingsService,
};
use std::sync::Arc;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "nport-cli", about = "Look up fund holdings from SEC NPORT-P filings")]
enum Opt {
    /// List every NPORT-P filing of a fund, newest first
    Filings {
        /// Central Index Key of the fund
        cik: String,
    },
    /// Show the holdings of the fund's most recent NPORT-P filing
    Holdings {
        /// Central Index Key of the fund
        cik: String,
        /// Print the holdings as JSON
        #[structopt(long)]
        json: bool,
        /// Show at most this many holdings
        #[structopt(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let opt = Opt::from_args();

    let config = NportConfig::from_env()?;
    let client = EdgarClient::new(
        &config.user_agent,
        config.http_timeout,
        config.edgar_data_url.clone(),
        config.edgar_archives_url.clone(),
    )?;
    let cache = Arc::new(DocumentCache::open(
        NportConfig::scratch_cache_dir(),
        config.cache_capacity,
    )?);
    let service = HoldingsService::new(Arc::new(client), Arc::clone(&cache));

    let outcome = run(&service, opt).await;
    cache.teardown().await?;
    outcome
}

async fn run(service: &HoldingsService, opt: Opt) -> Result<()> {
    match opt {
        Opt::Filings { cik } => {
            let index = service.filings(&cik).await?;
            print_filings(&index);
        }
        Opt::Holdings { cik, json, limit } => {
            let mut holdings = service.latest_holdings(&cik).await?;
            if let Some(limit) = limit {
                holdings.data.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&holdings)?);
            } else {
                print_holdings(&holdings);
            }
        }
    }
    Ok(())
}

fn print_filings(index: &FilingIndex) {
    println!("{}", index.fund_name.bold());
    if index.filings.is_empty() {
        println!("{}", "No NPORT-P filings found.".yellow());
        return;
    }
    for (i, filing) in index.filings.iter().enumerate() {
        let line = format!("{}  {}", filing.filing_date, filing.accession_number);
        if i == 0 {
            println!("{} {}", line.green(), "(latest)".dimmed());
        } else {
            println!("{}", line);
        }
    }
}

fn print_holdings(holdings: &FundHoldings) {
    println!(
        "{} {}",
        holdings.fund_name.bold(),
        format!(
            "NPORT-P {} filed {}",
            holdings.accession_number, holdings.filing_date
        )
        .dimmed()
    );
    println!(
        "{}",
        format!(
            "{:>5}  {:<40}  {:<9}  {:>18}  {:>20}  {}",
            "#", "Title", "CUSIP", "Units", "Value (USD)", "Cur"
        )
        .cyan()
    );
    for h in &holdings.data {
        println!(
            "{:>5}  {:<40}  {:<9}  {:>18.2}  {:>20.2}  {}",
            h.index,
            truncate(&h.title, 40),
            h.cusip,
            h.units,
            h.value,
            h.currency.as_deref().unwrap_or("")
        );
    }
    println!(
        "{}",
        format!(
            "{} holdings, total value {:.2} USD",
            holdings.data.len(),
            holdings.total_value()
        )
        .green()
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 3).collect();
        out.push_str("...");
        out
    }
}
