use super::ui;
use crate::core::{CurrencySources, RateCache, RateTable, RatesResponse};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Renders the table with one row per configured source, then any extra
/// entries the cache carries.
pub fn display_as_table(
    rates: &RateTable,
    sources: &[CurrencySources],
    last_refresh: DateTime<Utc>,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Source"),
        ui::header_cell("Rate"),
    ]);

    for config in sources {
        for source in &config.sources {
            table.add_row(vec![
                Cell::new(&config.currency),
                Cell::new(&source.name),
                ui::rate_cell(rates.rate(&config.currency, &source.name)),
            ]);
        }
    }

    for (currency, entries) in rates.iter() {
        let configured = sources.iter().find(|c| c.currency == currency);
        for entry in entries {
            let known =
                configured.is_some_and(|c| c.sources.iter().any(|s| s.name == entry.name));
            if !known {
                table.add_row(vec![
                    Cell::new(currency),
                    Cell::new(&entry.name),
                    ui::rate_cell(Some(entry.rate)),
                ]);
            }
        }
    }

    let mut output = format!("{}\n\n", ui::style_text("Exchange rates", ui::StyleType::Title));
    output.push_str(&table.to_string());
    if rates.is_empty() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text("No source returned a rate", ui::StyleType::Error)
        ));
    }
    output.push_str(&format!(
        "\n\n{}",
        ui::style_text(
            &format!("Last refresh: {}", last_refresh.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle
        )
    ));
    output
}

pub fn render(
    response: &RatesResponse,
    cache: &RateCache,
    last_refresh: DateTime<Utc>,
    json: bool,
) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(response)?)
    } else {
        Ok(display_as_table(response.rates(), cache.sources(), last_refresh))
    }
}

/// Queries the cache once and prints the result.
pub async fn run(cache: &RateCache, json: bool) -> Result<()> {
    let pb = ui::new_spinner("Fetching rates...");
    let response = cache.query().await;
    pb.finish_and_clear();

    let last_refresh = cache.last_refresh().await;
    println!("{}", render(&response, cache, last_refresh, json)?);
    Ok(())
}

/// Queries the cache every `every` until interrupted. Upstream is only hit
/// when the cache decides a refresh is due.
pub async fn watch(cache: &RateCache, every: Duration, json: bool) -> Result<()> {
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    watch_until(cache, every, json, shutdown).await?;
    Ok(())
}

/// Runs the watch loop until `shutdown` resolves and returns how many
/// queries were answered.
pub async fn watch_until<F>(
    cache: &RateCache,
    every: Duration,
    json: bool,
    shutdown: F,
) -> Result<usize>
where
    F: Future<Output = ()>,
{
    info!("Watching rates every {:?}", every);
    let mut ticker = tokio::time::interval(every);
    let mut queries = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let response = cache.query().await;
                let last_refresh = cache.last_refresh().await;
                println!("{}", render(&response, cache, last_refresh, json)?);
                queries += 1;
            }
            _ = &mut shutdown => {
                info!("Stopping watch after {} queries", queries);
                return Ok(queries);
            }
        }
    }
}
