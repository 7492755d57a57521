#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for neighborhood zoning lookups.
//!
//! Coordinates come from an external geocoder; this tool never parses
//! addresses.

use std::time::Duration;

use clap::{Parser, Subcommand};
use zone_map_jurisdiction::registry::global;
use zone_map_jurisdiction::{JurisdictionResolver, Resolution};
use zone_map_neighborhood::{
    AnalysisOptions, DEFAULT_FETCH_TIMEOUT, DEFAULT_HIGH_DIVERSITY_ZONE_COUNT,
    DEFAULT_RADIUS_METERS, NeighborhoodAnalyzer,
};
use zone_map_parcel::ParcelGateway;
use zone_map_zoning_models::GeoPoint;

#[derive(Parser)]
#[command(name = "zone_map", about = "Neighborhood zoning analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which jurisdiction governs a point
    Resolve {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Analyze the zoning of the neighborhood around a point
    Analyze {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Search radius in meters for nearby parcels
        #[arg(long, default_value_t = DEFAULT_RADIUS_METERS)]
        radius: f64,
        /// Time budget in seconds for each parcel data fetch
        #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
        timeout_secs: u64,
        /// Distinct zone count that marks a neighborhood as transitional
        #[arg(long, default_value_t = DEFAULT_HIGH_DIVERSITY_ZONE_COUNT)]
        diversity_zones: usize,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List all configured jurisdictions
    Jurisdictions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Jurisdictions => {
            let registry = global();
            println!("{:<20} {:<18} {:<8} NAME", "ID", "KIND", "PARENT");
            println!("{}", "-".repeat(70));
            for config in registry.all() {
                println!(
                    "{:<20} {:<18} {:<8} {}",
                    config.id(),
                    config.kind().as_ref(),
                    config.source().parent.as_deref().unwrap_or("-"),
                    config.name()
                );
            }
        }
        Commands::Resolve { lat, lng } => {
            let point = GeoPoint::new(lng, lat);
            let resolver = load_resolver().await?;
            let resolution = resolver.resolve(point)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&resolution_json(&resolution))?
            );
        }
        Commands::Analyze {
            lat,
            lng,
            radius,
            timeout_secs,
            diversity_zones,
            pretty,
        } => {
            let point = GeoPoint::new(lng, lat);
            let options = AnalysisOptions {
                radius_meters: radius,
                fetch_timeout: Duration::from_secs(timeout_secs),
                high_diversity_zone_count: diversity_zones,
            };
            options.validate()?;

            let resolver = load_resolver().await?;
            let resolution = resolver.resolve(point)?;
            log::info!(
                "Analyzing ({lng}, {lat}) in {}{}",
                resolution.jurisdiction.name,
                if resolution.unverified {
                    " (unverified)"
                } else {
                    ""
                }
            );

            let gateway = ParcelGateway::new(options.fetch_timeout)?;
            let analyzer = NeighborhoodAnalyzer::new(global(), gateway);
            let analysis = analyzer
                .analyze(&resolution, point, &options)
                .await?;

            let json = if pretty {
                serde_json::to_string_pretty(&analysis)?
            } else {
                serde_json::to_string(&analysis)?
            };
            println!("{json}");

            if analysis.is_partial() {
                eprintln!("WARNING: neighborhood data unavailable; this analysis is partial");
            }
            if analysis.unverified {
                eprintln!(
                    "WARNING: town boundary not verified for this point; county data was used"
                );
            }
        }
    }

    Ok(())
}

/// Builds the resolver, fetching any remote town boundaries.
async fn load_resolver() -> Result<JurisdictionResolver, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(JurisdictionResolver::load(&client, global()).await?)
}

fn resolution_json(resolution: &Resolution) -> serde_json::Value {
    serde_json::json!({
        "jurisdictionId": resolution.jurisdiction.id,
        "jurisdictionName": resolution.jurisdiction.name,
        "kind": resolution.jurisdiction.kind.as_ref(),
        "unverified": resolution.unverified,
        "placeholderTown": resolution.placeholder_town,
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_longitude() {
        let cli = Cli::try_parse_from([
            "zone_map", "analyze", "--lat", "35.91", "--lng", "-79.06", "--radius", "400",
        ])
        .unwrap();
        let Commands::Analyze {
            lat, lng, radius, ..
        } = cli.command
        else {
            panic!("expected analyze");
        };
        assert!((lat - 35.91).abs() < f64::EPSILON);
        assert!((lng - -79.06).abs() < f64::EPSILON);
        assert!((radius - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn analyze_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["zone_map", "analyze", "--lat", "36.1", "--lng", "-79.2"])
            .unwrap();
        let Commands::Analyze {
            radius,
            timeout_secs,
            diversity_zones,
            ..
        } = cli.command
        else {
            panic!("expected analyze");
        };
        let defaults = AnalysisOptions::default();
        assert!((radius - defaults.radius_meters).abs() < f64::EPSILON);
        assert_eq!(Duration::from_secs(timeout_secs), defaults.fetch_timeout);
        assert_eq!(diversity_zones, defaults.high_diversity_zone_count);
    }

    #[test]
    fn placeholder_resolution_is_reported() {
        let resolver = JurisdictionResolver::from_static(global()).unwrap();
        let resolution = resolver.resolve(GeoPoint::new(-79.10, 36.07)).unwrap();
        let json = resolution_json(&resolution);
        assert_eq!(json["jurisdictionId"], "orange_county_nc");
        assert_eq!(json["kind"], "county");
        assert_eq!(json["unverified"], true);
        assert_eq!(json["placeholderTown"], "hillsborough");
    }
}
