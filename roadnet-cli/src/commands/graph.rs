use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use roadnet::export::graph_to_tables;
use roadnet::{BoundingBox, NetworkType};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use super::SourceArgs;

pub fn run(
    source: SourceArgs,
    bbox: BoundingBox,
    network: NetworkType,
    simplify: bool,
    nodes: bool,
    buffer: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    let service = source.builder().buffer_meters(buffer).build();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?);
    pb.set_message(format!(
        "Extracting {} network from {}",
        network,
        service.source_description()
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = service.graph_from_bbox(&bbox, network, simplify);
    pb.finish_and_clear();
    let graph = result.context("Failed to extract road network")?;

    let (node_table, edge_table) =
        graph_to_tables(&graph).context("Failed to convert graph to tables")?;
    let geojson = if nodes {
        node_table.to_geojson_string()?
    } else {
        edge_table.to_geojson_string()?
    };

    match output {
        Some(path) => {
            let file = File::create(&path).context("Failed to create output file")?;
            let mut writer = BufWriter::new(file);
            writer.write_all(geojson.as_bytes())?;
            writer.flush()?;
            eprintln!(
                "{} nodes, {} edges written to: {}",
                node_table.len(),
                edge_table.len(),
                path.display()
            );
        }
        None => println!("{}", geojson),
    }

    Ok(())
}
