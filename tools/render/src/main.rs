//! Diagnostic choropleth renderer — rasterizes one combination to a PNG.
//! Not part of the serving path; offline inspection only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};

use atlas_core::cache::CacheConfig;
use atlas_core::choropleth::Choropleth;
use atlas_core::service::AtlasService;
use atlas_core::store::geometry::LonLat;
use atlas_core::store::rules::Spacing;
use atlas_core::store::DataPaths;

const BACKGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
/// Fraction of the map span added around the outline.
const MARGIN: f64 = 0.03;

#[derive(Parser, Debug)]
#[command(name = "render", about = "Rasterize a choropleth layer to PNG")]
struct Args {
    /// Directory holding regions.geojson, zones.json, rules.json, details.json.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Configuration to render.
    #[arg(short, long)]
    config: String,

    /// Post spacing: "wide" (3.00 m) or "narrow" (2.50 m).
    #[arg(short, long, default_value = "wide")]
    spacing: String,

    /// Output PNG path.
    #[arg(short, long, default_value = "choropleth.png")]
    output: PathBuf,

    /// Image width in pixels; height follows the map's aspect ratio.
    #[arg(long, default_value = "1200")]
    width: u32,
}

/// Joint bounding box of every region in the layer, with margin.
fn layer_bbox(choropleth: &Choropleth) -> (f64, f64, f64, f64) {
    let mut min_lon = f64::INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    for shade in &choropleth.shades {
        let (lo, la, ho, ha) = shade.region.geometry.bbox();
        min_lon = min_lon.min(lo);
        min_lat = min_lat.min(la);
        max_lon = max_lon.max(ho);
        max_lat = max_lat.max(ha);
    }
    let pad_lon = (max_lon - min_lon) * MARGIN;
    let pad_lat = (max_lat - min_lat) * MARGIN;
    (min_lon - pad_lon, min_lat - pad_lat, max_lon + pad_lon, max_lat + pad_lat)
}

fn rasterize(choropleth: &Choropleth, width: u32) -> RgbImage {
    let (min_lon, min_lat, max_lon, max_lat) = layer_bbox(choropleth);
    let lon_span = max_lon - min_lon;
    let lat_span = max_lat - min_lat;
    let height = ((width as f64) * lat_span / lon_span).round().max(1.0) as u32;

    let px_lon = lon_span / width as f64;
    let px_lat = lat_span / height as f64;

    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    // One pass per region over its own bounding box only; row 0 is north.
    for shade in &choropleth.shades {
        let (lo, la, ho, ha) = shade.region.geometry.bbox();
        let x0 = (((lo - min_lon) / px_lon).floor().max(0.0)) as u32;
        let x1 = ((((ho - min_lon) / px_lon).ceil()) as u32).min(width);
        let y0 = (((max_lat - ha) / px_lat).floor().max(0.0)) as u32;
        let y1 = ((((max_lat - la) / px_lat).ceil()) as u32).min(height);

        let color = Rgb(shade.color.0);
        for y in y0..y1 {
            let lat = max_lat - (y as f64 + 0.5) * px_lat;
            for x in x0..x1 {
                let lon = min_lon + (x as f64 + 0.5) * px_lon;
                if shade.region.geometry.contains(LonLat::new(lon, lat)) {
                    img.put_pixel(x, y, color);
                }
            }
        }
    }
    img
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let spacing: Spacing = args
        .spacing
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let paths = DataPaths::in_dir(&args.data_dir);
    let service = AtlasService::open(paths, CacheConfig::default())
        .with_context(|| format!("cannot open atlas data in {}", args.data_dir.display()))?;

    let view = service
        .get_view(&args.config, spacing)
        .with_context(|| format!("no view for {} at {spacing}", args.config))?;

    println!("Rendering {} ({} regions)…", view.choropleth.combination, view.choropleth.shades.len());
    let img = rasterize(&view.choropleth, args.width);
    img.save(&args.output)
        .with_context(|| format!("failed to save {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());

    for entry in &view.choropleth.legend {
        println!("  {}  {}", entry.color.hex(), entry.label);
    }
    let stats = view.statistics();
    println!(
        "Coverage {} / {} regions; {} not admissible, {} without rule",
        stats.admissible, stats.total_regions, stats.not_admissible, stats.unresolvable
    );
    Ok(())
}
