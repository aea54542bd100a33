use anyhow::{Context, Result};
use roadnet::osm::OsmResponse;
use roadnet::NetworkType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Serialize)]
struct InfoResponse {
    file: String,
    file_size: u64,
    elements: usize,
    nodes: usize,
    ways: usize,
    ways_per_network: BTreeMap<&'static str, usize>,
}

pub fn run(osm_file: Option<PathBuf>, json: bool) -> Result<()> {
    let path = osm_file.context(
        "ROADNET_OSM_FILE environment variable not set. Use --osm-file or set ROADNET_OSM_FILE",
    )?;

    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let file_size = file.metadata()?.len();
    let response =
        OsmResponse::from_reader(BufReader::new(file)).context("Failed to parse OSM response")?;

    let ways: Vec<_> = response.ways().collect();
    let ways_per_network = NetworkType::ALL
        .iter()
        .map(|network| {
            let matching = ways
                .iter()
                .filter(|(_, _, tags)| network.matches(tags))
                .count();
            (network.as_str(), matching)
        })
        .collect();

    let info = InfoResponse {
        file: path.display().to_string(),
        file_size,
        elements: response.elements.len(),
        nodes: response.nodes().count(),
        ways: ways.len(),
        ways_per_network,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", info.file);
    println!("File size: {}", format_size(info.file_size));
    println!();
    println!("Elements: {}", info.elements);
    println!("Nodes: {}", info.nodes);
    println!("Ways: {}", info.ways);
    println!();
    println!("Ways per network type:");
    for network in NetworkType::ALL {
        let matching = info.ways_per_network[network.as_str()];
        println!("  {:<12} {}", network.as_str(), matching);
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
