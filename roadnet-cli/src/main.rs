use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use roadnet::NetworkType;
use std::path::PathBuf;

mod commands;

/// OpenStreetMap road network CLI tool
#[derive(Parser)]
#[command(name = "roadnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Saved Overpass JSON response to read instead of querying Overpass
    #[arg(long, env = "ROADNET_OSM_FILE", global = true)]
    osm_file: Option<PathBuf>,

    /// Overpass interpreter endpoint
    #[arg(long, env = "ROADNET_OVERPASS_URL", global = true)]
    overpass_url: Option<String>,

    /// Overpass query timeout in seconds
    #[arg(
        long,
        env = "ROADNET_OVERPASS_TIMEOUT",
        default_value = "180",
        global = true
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Bounding box in decimal degrees.
#[derive(Args, Debug, Clone, Copy)]
struct BboxArgs {
    /// Northern latitude
    #[arg(long, allow_negative_numbers = true)]
    north: f64,

    /// Southern latitude
    #[arg(long, allow_negative_numbers = true)]
    south: f64,

    /// Eastern longitude
    #[arg(long, allow_negative_numbers = true)]
    east: f64,

    /// Western longitude
    #[arg(long, allow_negative_numbers = true)]
    west: f64,
}

impl From<BboxArgs> for roadnet::BoundingBox {
    fn from(args: BboxArgs) -> Self {
        roadnet::BoundingBox::new(args.north, args.south, args.east, args.west)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the road network inside a bounding box as GeoJSON
    Graph {
        #[command(flatten)]
        bbox: BboxArgs,

        /// Network type: drive, drive_service, walk, bike, all, all_private
        #[arg(short, long, default_value = "drive")]
        network_type: NetworkType,

        /// Keep every OSM node instead of merging shape points
        #[arg(long)]
        no_simplify: bool,

        /// Output intersections instead of road segments
        #[arg(long)]
        nodes: bool,

        /// Distance in meters to enlarge the download box by
        #[arg(long, env = "ROADNET_BUFFER_METERS", default_value = "500")]
        buffer: f64,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the Overpass query for a bounding box
    QueryString {
        #[command(flatten)]
        bbox: BboxArgs,

        /// Network type: drive, drive_service, walk, bike, all, all_private
        #[arg(short, long, default_value = "drive")]
        network_type: NetworkType,
    },

    /// Summarize a saved Overpass response
    Info {
        /// Output summary as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = commands::SourceArgs {
        osm_file: cli.osm_file,
        overpass_url: cli.overpass_url,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::Graph {
            bbox,
            network_type,
            no_simplify,
            nodes,
            buffer,
            output,
        } => commands::graph::run(
            source,
            bbox.into(),
            network_type,
            !no_simplify,
            nodes,
            buffer,
            output,
        ),
        Commands::QueryString { bbox, network_type } => {
            commands::query_string::run(bbox.into(), network_type, source.timeout)
        }
        Commands::Info { json } => commands::info::run(source.osm_file, json),
    }
}
