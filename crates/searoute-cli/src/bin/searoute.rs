//! Generate, smooth, save, and inspect sea routes from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use searoute_cli::{parse_port, SaveBackoff};
use searoute_core::models::{parse_lat_lng_pairs, Port};
use searoute_core::segment::{RouteType, SegmentMetadata, SegmentSaveRequest};
use searoute_core::smoothing::smooth;
use searoute_sdk::{DistanceUnits, RouteResponse, SeaRouteClient};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// searoute server URL
    #[arg(long, env = "SEAROUTE_URL", default_value = "http://localhost:3000", global = true)]
    url: String,

    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a route between two ports
    Route {
        /// Catalog id or id:lat,lon
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value_t = Units::Nm)]
        units: Units,
    },
    /// Save a segment version, generating the route unless --coords is given
    Save {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Manual polyline as JSON [[lat,lng],...]
        #[arg(long)]
        coords: Option<String>,
        #[arg(long, default_value = "cli")]
        created_by: String,
        /// Total attempts for retryable failures
        #[arg(long, default_value_t = 3)]
        attempts: u32,
    },
    /// List every stored version of a segment
    History { segment_id: String },
    /// Smooth a polyline locally
    Smooth {
        /// Polyline as JSON [[lat,lng],...]
        #[arg(long)]
        coords: String,
        #[arg(long, default_value_t = 1)]
        passes: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Units {
    Km,
    Nm,
}

impl From<Units> for DistanceUnits {
    fn from(units: Units) -> Self {
        match units {
            Units::Km => DistanceUnits::Kilometers,
            Units::Nm => DistanceUnits::NauticalMiles,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = SeaRouteClient::new(&cli.url);

    match cli.command {
        Command::Route { from, to, units } => {
            let (origin, destination) = ports(&from, &to)?;
            let route = client.generate_route(&origin, &destination, units.into()).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&route)?);
            } else {
                print_route(&origin, &destination, &route);
            }
        }
        Command::Save {
            from,
            to,
            coords,
            created_by,
            attempts,
        } => {
            let (origin, destination) = ports(&from, &to)?;
            let (route_coordinates, route_type) = match coords {
                Some(raw) => (parse_coords(&raw)?, RouteType::Manual),
                None => {
                    let route = client
                        .generate_route(&origin, &destination, DistanceUnits::NauticalMiles)
                        .await?;
                    (route.lat_lng_coordinates(), RouteType::Generated)
                }
            };

            let mut pending = client.prepare_save(SegmentSaveRequest {
                origin_port: origin,
                destination_port: destination,
                route_coordinates,
                route_type,
                distance_nautical_miles: None,
                distance_km: None,
                created_by: Some(created_by),
                metadata: SegmentMetadata::default(),
            })?;

            let mut backoff = SaveBackoff::new(Duration::from_millis(500), Duration::from_secs(5));
            let mut result = client.save_segment(&mut pending).await;
            let saved = loop {
                match result {
                    Ok(saved) => break saved,
                    Err(err) if err.is_retryable() && pending.attempts() < attempts => {
                        let delay = backoff.next_delay();
                        eprintln!("Save failed ({}), retrying in {:?}", err, delay);
                        tokio::time::sleep(delay).await;
                        result = client.retry_save(&mut pending).await;
                    }
                    Err(err) => return Err(err.into()),
                }
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&saved)?);
            } else {
                println!("{}", saved.message);
                println!("  created {}", saved.created_at.to_rfc3339());
                println!("  updated {}", saved.updated_at.to_rfc3339());
            }
        }
        Command::History { segment_id } => {
            let versions = client.history(&segment_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
            } else {
                println!("{} ({} versions)", segment_id, versions.len());
                for record in versions {
                    println!(
                        "  v{:<3} {:<9} {:>4} pts {:>9.1} nm  by {:<12} updated {}{}",
                        record.version,
                        record.route_type.as_str(),
                        record.route_coordinates.len(),
                        record.distance_nautical_miles,
                        record.created_by,
                        record.updated_at.to_rfc3339(),
                        if record.is_active { "  (active)" } else { "" }
                    );
                }
            }
        }
        Command::Smooth { coords, passes } => {
            let mut vertices = parse_lat_lng_pairs(&parse_coords(&coords)?, "coords")?;
            for pass in 1..=passes.max(1) {
                match smooth(&vertices) {
                    Ok(next) => vertices = next,
                    Err(notice) => {
                        eprintln!("Pass {}: {}", pass, notice);
                        break;
                    }
                }
            }
            let out: Vec<[f64; 2]> = vertices.iter().map(|p| p.to_lat_lng()).collect();
            println!("{}", serde_json::to_string(&out)?);
        }
    }

    Ok(())
}

fn ports(from: &str, to: &str) -> Result<(Port, Port)> {
    Ok((parse_port(from)?, parse_port(to)?))
}

fn parse_coords(raw: &str) -> Result<Vec<[f64; 2]>> {
    serde_json::from_str(raw).context("coords must be a JSON array of [lat, lng] pairs")
}

fn print_route(origin: &Port, destination: &Port, route: &RouteResponse) {
    println!("{} -> {}", origin.name, destination.name);
    println!("  kind:     {:?}", route.kind);
    println!("  points:   {}", route.coordinates.len());
    println!(
        "  distance: {:.1} nm / {:.1} km",
        route.total_distance_nm, route.total_distance_km
    );
    println!("  duration: {}", route.estimated_duration);
    let land = route.segments.iter().filter(|s| s.crosses_land).count();
    if land > 0 {
        println!("  {} of {} legs touch land (shown dotted)", land, route.segments.len());
    }
    for [lat, lng] in route.lat_lng_coordinates() {
        println!("    {:>10.5} {:>11.5}", lat, lng);
    }
}
