//! Print the stops closest to a coordinate from the live catalog.
//!
//! Usage: `nearest <lat> <lng> [from HH:MM] [to HH:MM]`

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use dotenvy::dotenv;
use log::info;

use garbage_bot::core::{format_clock, Config};
use garbage_bot::features::collection::{
    directions_url, format_distance, CatalogSource, HttpCatalog, StopSearch, TimeWindow,
};
use garbage_bot::features::reminders::ReminderRequest;

fn parse_coordinate(args: &[String]) -> Result<(f64, f64)> {
    let (lat, lng) = match args {
        [lat, lng, ..] => (lat, lng),
        _ => return Err(anyhow!("Usage: nearest <lat> <lng> [from HH:MM] [to HH:MM]")),
    };
    let lat = lat.parse::<f64>().with_context(|| format!("Invalid latitude: {lat}"))?;
    let lng = lng.parse::<f64>().with_context(|| format!("Invalid longitude: {lng}"))?;
    Ok((lat, lng))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env_without_token()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (lat, lng) = parse_coordinate(&args)?;
    let from = args.get(2).map(String::as_str);
    let to = args.get(3).map(String::as_str);

    let now = Utc::now();
    let window = TimeWindow::from_clock(from, to, config.timezone, now)?;

    let catalog = HttpCatalog::new(config.catalog_url.clone())?
        .fetch_catalog()
        .await?;
    info!("Searching {} collection points", catalog.len());

    let search = StopSearch::from_config(&config);
    let candidates = search.search_at(lat, lng, catalog.points(), Some(&window), now);

    if candidates.is_empty() {
        println!("No collection stops found near {lat},{lng}");
        return Ok(());
    }

    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "{}. {} [{}] {} arrives {}",
            i + 1,
            candidate.stop_name,
            candidate.route_name,
            format_distance(candidate.distance_m),
            format_clock(config.timezone, candidate.eta),
        );
        println!("   {}", directions_url(&candidate.coordinate));
        println!("   {}", ReminderRequest::from_candidate(candidate).to_payload());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(
            parse_coordinate(&args(&["25.03", "121.56", "18:00"])).unwrap(),
            (25.03, 121.56)
        );
        assert!(parse_coordinate(&args(&["25.03"])).is_err());
        assert!(parse_coordinate(&args(&["north", "121.56"])).is_err());
    }
}
