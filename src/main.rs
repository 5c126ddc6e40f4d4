//! extent_dispatch CLI
//!
//! This is a demonstration CLI for the extent_dispatch library.

use anyhow::{Context, Result};
use extent_dispatch::prelude::*;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::init();

    // Parse command line args
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        return;
    }

    let result = match args[1].as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("Error: Please specify dimensions");
                eprintln!("Usage: {} run <WxHxD> [options]", args[0]);
                return;
            }
            run(&args[2..])
        }
        "split" => {
            if args.len() < 9 {
                eprintln!("Error: Please specify six bounds and a piece count");
                eprintln!("Usage: {} split <min0> <max0> <min1> <max1> <min2> <max2> <total>", args[0]);
                return;
            }
            split(&args[2..9])
        }
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(&args[0]);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("extent_dispatch v{}", extent_dispatch::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  run <WxHxD> [options]          Invert a test volume in parallel");
    println!("  split <6 bounds> <total>       Show how an extent is split");
    println!("  help                           Show this help message");
    println!();
    println!("Run options:");
    println!("  --backend <name>    fixed_pool, dynamic_blocks or sequential");
    println!("  --workers <n>       Worker threads (default: available cores)");
    println!("  --blocks <n>        Target block count for dynamic_blocks (0 = auto)");
    println!("  --config <file>     Load settings from a TOML file first");
    println!("  --json              Print the report as JSON");
    println!("  --png <file>        Save slice 0 of the result as a grayscale PNG");
}

struct RunOptions {
    config: DispatchConfig,
    json: bool,
    png: Option<PathBuf>,
}

fn parse_run_options(args: &[String]) -> Result<RunOptions> {
    let mut config = DispatchConfig::new();
    let mut backend: Option<Backend> = None;
    let mut workers: Option<i64> = None;
    let mut blocks: Option<i64> = None;
    let mut json = false;
    let mut png = None;

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--backend", Some(name)) => {
                backend = Some(Backend::parse(name).with_context(|| format!("unknown backend '{}'", name))?);
                i += 2;
            }
            ("--workers", Some(n)) => {
                workers = Some(n.parse().with_context(|| format!("invalid worker count '{}'", n))?);
                i += 2;
            }
            ("--blocks", Some(n)) => {
                blocks = Some(n.parse().with_context(|| format!("invalid block hint '{}'", n))?);
                i += 2;
            }
            ("--config", Some(path)) => {
                config = DispatchConfig::load(path).with_context(|| format!("loading {}", path))?;
                i += 2;
            }
            ("--png", Some(path)) => {
                png = Some(PathBuf::from(path));
                i += 2;
            }
            ("--json", _) => {
                json = true;
                i += 1;
            }
            (other, _) => {
                eprintln!("Unknown option: {}", other);
                i += 1;
            }
        }
    }

    // Command line values override the config file.
    if let Some(backend) = backend {
        config.backend = backend;
    }
    if let Some(workers) = workers {
        config.set_worker_count(workers)?;
    }
    if let Some(blocks) = blocks {
        config.set_block_hint(blocks)?;
    }

    Ok(RunOptions { config, json, png })
}

fn run(args: &[String]) -> Result<()> {
    let dims = parse_dimensions(&args[0])
        .with_context(|| format!("invalid dimensions '{}', expected WxH or WxHxD", args[0]))?;
    let options = parse_run_options(&args[1..])?;

    let extent = Extent::from_dimensions(dims);
    let input = Volume::from_fn(extent, |[x, y, z]| ((x + y + z * 16) % 256) as u8);
    let mut output = Volume::new(extent, 0u8);

    let invert = FnOperation::new("invert", |ctx: &mut PieceContext<'_, u8, u8>| {
        let input = ctx.first_input()?;
        let mut out = ctx.output(0)?;
        out.fill_with(|index| 255 - input.get(index).copied().unwrap_or(0))
    });

    if !options.json {
        println!("⚙️  Inverting {} with", extent);
        println!("{}", options.config);
    }

    let engine = DispatchEngine::new();
    let report = engine.execute(&[vec![&input]], &mut [&mut output], &invert, &options.config)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
        for failure in report.failures() {
            eprintln!("   {}", failure);
        }
    }

    let report = report.into_result()?;

    if let Some(path) = options.png {
        save_slice(&output, &path)?;
        if !options.json {
            println!("🎉 Slice 0 saved to: {}", path.display());
        }
    }

    log::debug!("processed {} cells", report.processed_cells());
    Ok(())
}

fn split(args: &[String]) -> Result<()> {
    let mut bounds = [0i32; 6];
    for (bound, text) in bounds.iter_mut().zip(&args[..6]) {
        *bound = text.parse().with_context(|| format!("invalid bound '{}'", text))?;
    }
    let total: usize = args[6]
        .parse()
        .with_context(|| format!("invalid piece count '{}'", args[6]))?;

    let full = Extent::new(bounds);
    println!("Splitting {} into {} pieces:", full, total);
    for piece in 0..total.max(1) {
        let result = split_extent(&full, piece, total);
        if result.is_in_range(piece) {
            println!("  • {:>3}: {}", piece, result.extent);
        } else {
            println!("  • {:>3}: idle", piece);
        }
    }
    println!("Achieved {} pieces", split_extent(&full, 0, total).achieved);
    Ok(())
}

fn save_slice(volume: &Volume<u8>, path: &Path) -> Result<()> {
    let [width, height, _] = volume.extent().dimensions();
    let pixels = volume.slice(volume.extent().axis(2).0).context("volume has no slices")?;
    let image = image::GrayImage::from_raw(width as u32, height as u32, pixels.to_vec())
        .context("slice does not match image dimensions")?;
    image.save(path).with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

fn parse_dimensions(s: &str) -> Option<[usize; 3]> {
    let parts: Vec<&str> = s.split('x').collect();
    let dims = match parts.len() {
        2 => [parts[0].parse().ok()?, parts[1].parse().ok()?, 1],
        3 => [parts[0].parse().ok()?, parts[1].parse().ok()?, parts[2].parse().ok()?],
        _ => return None,
    };
    if dims.contains(&0) {
        return None;
    }
    Some(dims)
}
