//! World generator binary, pre-generates a square region of chunks to disk.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   World config JSON to start from (optional)
//!   --radius <N>      Region half-width in chunks (default: 8)
//!   --seed <SEED>     World seed (overrides config)
//!   --name <NAME>     World name / output directory (default: "terrain")
//!   --jobs <N>        Max parallel chunk columns (default: 4)
//!
//! Output structure:
//!   assets/worlds/<name>/
//!     world.json              # Config used, reopenable with World::open
//!     manifest.json           # Region, chunk counts and surface statistics
//!     chunks/y_<y>/chunk_<x>_<y>_<z>.chk

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde_json::json;

use chunkworld::core::{Result, WorldConfig};
use chunkworld::voxel::chunk::{ChunkCoord, CHUNK_SIZE};
use chunkworld::voxel::world::{World, MAX_WORLD_HEIGHT_IN_CHUNKS};
use chunkworld::voxel::RequestLevel;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    if let Err(e) = run() {
        log::error!("World generation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let radius: i32 = parse_arg(&args, "--radius").unwrap_or(8);
    let jobs: usize = parse_arg(&args, "--jobs").unwrap_or(4);

    let mut config = match parse_arg::<PathBuf>(&args, "--config") {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig { name: "terrain".to_string(), ..WorldConfig::default() },
    };
    if let Some(seed) = parse_arg(&args, "--seed") {
        config.seed = seed;
    }
    if let Some(name) = parse_arg(&args, "--name") {
        config.name = name;
    }

    let output_dir = PathBuf::from(format!("assets/worlds/{}", config.name));
    config.storage_dir = Some(output_dir.join("chunks"));

    // Keep a full column set per worker resident while it is scanned
    let column_chunks = MAX_WORLD_HEIGHT_IN_CHUNKS as usize;
    config.cache_capacity = config.cache_capacity.max(jobs * column_chunks * 2);

    // Limit rayon's thread pool to cap peak memory usage
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
        log::warn!("Could not configure thread pool: {}", e);
    }

    std::fs::create_dir_all(&output_dir)?;
    config.save(output_dir.join("world.json"))?;

    let side = radius * 2 + 1;
    println!("=== Chunkworld Generator ===");
    println!("World:  {}", config.name);
    println!("Seed:   {}", config.seed);
    println!("Region: {} x {} chunk columns ({} blocks square)", side, side, side * CHUNK_SIZE as i32);
    println!("Kind:   {:?}", config.generation.generator);
    println!("Jobs:   {} parallel", jobs);
    println!("Output: {}", output_dir.display());
    println!();

    let world = World::open(&config)?;

    let columns: Vec<(i32, i32)> = (-radius..=radius)
        .flat_map(|cx| (-radius..=radius).map(move |cz| (cx, cz)))
        .collect();
    let total = columns.len();

    let start = Instant::now();
    let done = AtomicUsize::new(0);

    // Generate each column, then sample the surface at the column's centre
    let surfaces: Vec<Result<(i32, i32, Option<i32>, Vec<i32>)>> = columns
        .par_iter()
        .map(|&(cx, cz)| -> Result<(i32, i32, Option<i32>, Vec<i32>)> {
            let mut occupied_levels = Vec::new();
            for cy in 0..MAX_WORLD_HEIGHT_IN_CHUNKS {
                let coord = ChunkCoord::new(cx, cy, cz);
                if let Some(chunk) = world.chunk_at(coord, RequestLevel::Generate, true)? {
                    if !chunk.read().is_empty() {
                        occupied_levels.push(cy);
                    }
                }
            }

            let half = CHUNK_SIZE as i32 / 2;
            let x = cx * CHUNK_SIZE as i32 + half;
            let z = cz * CHUNK_SIZE as i32 + half;
            let surface = world.get_highest_y_at(x, z, RequestLevel::Load)?;

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % 64 == 0 || finished == total {
                let elapsed = start.elapsed().as_secs_f64();
                let rate = finished as f64 / elapsed;
                let remaining = (total - finished) as f64 / rate;
                eprintln!("  [{}/{}] {:.0} columns/sec, ~{:.0}s remaining",
                    finished, total, rate, remaining);
            }

            Ok((cx, cz, surface, occupied_levels))
        })
        .collect();

    let surfaces = surfaces.into_iter().collect::<Result<Vec<_>>>()?;
    let elapsed = start.elapsed();

    let mut y_levels: BTreeMap<i32, usize> = BTreeMap::new();
    let mut heights = Vec::with_capacity(surfaces.len());
    for (_, _, surface, levels) in &surfaces {
        for &cy in levels {
            *y_levels.entry(cy).or_insert(0) += 1;
        }
        if let Some(h) = surface {
            heights.push(*h);
        }
    }
    let chunk_count: usize = y_levels.values().sum();

    let stats = world.store().stats();
    world.on_exit()?;

    let min_height = heights.iter().copied().min();
    let max_height = heights.iter().copied().max();
    let mean_height = if heights.is_empty() {
        0.0
    } else {
        heights.iter().map(|&h| h as f64).sum::<f64>() / heights.len() as f64
    };

    println!();
    println!("Generated {} chunks in {:.1}s ({:.0} chunks/sec)",
        stats.generated, elapsed.as_secs_f64(),
        stats.generated as f64 / elapsed.as_secs_f64());
    println!("Non-empty: {} chunks", chunk_count);

    let manifest = json!({
        "name": config.name,
        "seed": config.seed,
        "chunk_size": CHUNK_SIZE,
        "radius_in_chunks": radius,
        "columns": total,
        "chunk_count": chunk_count,
        "y_levels": y_levels,
        "surface": {
            "sampled_columns": heights.len(),
            "min": min_height,
            "max": max_height,
            "mean": mean_height,
        },
        "columns_detail": surfaces.iter().map(|(x, z, surface, _)| {
            json!({"x": x, "z": z, "surface": surface})
        }).collect::<Vec<_>>(),
    });

    let manifest_path = output_dir.join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    println!();
    println!("=== Generation Complete ===");
    println!("Surface: min {}, max {}, mean {:.1}",
        min_height.unwrap_or(0),
        max_height.unwrap_or(0),
        mean_height);
    println!("Output:  {}", output_dir.display());

    Ok(())
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
