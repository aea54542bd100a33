use anyhow::Result;
use roadnet::overpass::build_query;
use roadnet::{BoundingBox, NetworkType};

pub fn run(bbox: BoundingBox, network: NetworkType, timeout: u64) -> Result<()> {
    println!("{}", build_query(&bbox, network, timeout));
    Ok(())
}
