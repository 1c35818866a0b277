//! postfire CLI - post-fire burn severity, erosion risk and recovery maps

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use postfire_algorithms::classification::{burn_severity, SeverityParams};
use postfire_algorithms::mce::{presets, McePipeline, MceOutput, PipelineConfig};
use postfire_algorithms::statistics::{area_in_ranges, class_statistics, AreaRange, ClassStatistics, RangeArea};
use postfire_core::io::{read_geotiff, write_geotiff};
use postfire_core::{Raster, RasterElement, Region};

use config::{AnalysisConfig, PipelineReport, RegionSpec, Report};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "postfire")]
#[command(author, version, about = "Post-fire decision-support maps", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Classify dNBR into burn severity classes
    Severity {
        /// dNBR raster
        input: PathBuf,
        /// Output class raster
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Multiplier applied to dNBR before classification
        #[arg(long, default_value_t = 1000.0)]
        scale: f64,
        /// Sampling resolution of the class table (default: input cell size)
        #[arg(short, long)]
        resolution: Option<f64>,
        /// Region bounds: min_x,min_y,max_x,max_y
        #[arg(long)]
        bounds: Option<String>,
    },
    /// Run a multi-criteria pipeline
    Mce {
        /// Preset name (soil-erosion, vegetation-recovery)
        #[arg(required_unless_present = "config", conflicts_with = "config")]
        pipeline: Option<String>,
        /// Criterion layer, name=path (repeatable)
        #[arg(short, long = "input", value_parser = parse_key_val::<PathBuf>)]
        inputs: Vec<(String, PathBuf)>,
        /// Pipeline configuration JSON, replaces the preset
        #[arg(long)]
        config: Option<PathBuf>,
        /// Weight override, name=value (repeatable)
        #[arg(short, long = "weight", value_parser = parse_key_val::<f64>)]
        weights: Vec<(String, f64)>,
        /// Output composite raster
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output composite rescaled to [0, 100]
        #[arg(long)]
        normalized_output: Option<PathBuf>,
        /// Sampling resolution (default: input cell size)
        #[arg(short, long)]
        resolution: Option<f64>,
        /// Region bounds: min_x,min_y,max_x,max_y
        #[arg(long)]
        bounds: Option<String>,
    },
    /// Area of a raster inside value ranges
    Areas {
        /// Input raster
        input: PathBuf,
        /// Open range lower:upper:label (repeatable)
        #[arg(long = "range", required = true, allow_hyphen_values = true, value_parser = parse_range)]
        ranges: Vec<AreaRange>,
        /// Sampling resolution (default: input cell size)
        #[arg(short, long)]
        resolution: Option<f64>,
        /// Region bounds: min_x,min_y,max_x,max_y
        #[arg(long)]
        bounds: Option<String>,
    },
    /// Run every stage of an analysis file
    Run {
        /// Analysis JSON file
        config: PathBuf,
        /// Output directory (overrides the file's output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Print a preset pipeline as JSON
    Preset {
        /// Preset name (soil-erosion, vegetation-recovery)
        name: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner(&format!("Reading {}...", path.display()))?;
    let raster: Raster<T> =
        read_geotiff(path).with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input {}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result<T: RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_geotiff(raster, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_key_val<T>(s: &str) -> std::result::Result<(String, T), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let value = value.parse().map_err(|e| format!("'{value}': {e}"))?;
    Ok((key.trim().to_string(), value))
}

fn parse_range(s: &str) -> std::result::Result<AreaRange, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(lower), Some(upper)) = (parts.next(), parts.next()) else {
        return Err(format!("expected lower:upper[:label], got '{s}'"));
    };
    let lower: f64 = lower.parse().map_err(|e| format!("lower bound '{lower}': {e}"))?;
    let upper: f64 = upper.parse().map_err(|e| format!("upper bound '{upper}': {e}"))?;
    let label = parts.next().map_or_else(|| format!("({lower}, {upper})"), str::to_string);
    Ok(AreaRange::new(lower, upper, label))
}

fn parse_bounds(bounds: Option<&str>) -> Result<Region> {
    let Some(s) = bounds else {
        return Ok(Region::Full);
    };
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid bounds '{s}'"))?;
    let Ok(b) = <[f64; 4]>::try_from(values) else {
        bail!("bounds need four values: min_x,min_y,max_x,max_y");
    };
    Ok(Region::bounds(b)?)
}

fn print_class_table(stats: &ClassStatistics) {
    println!(
        "{:>5}  {:<24} {:>10} {:>12} {:>8}",
        "Class", "Label", "Pixels", "Area (km2)", "%"
    );
    for rec in &stats.classes {
        println!(
            "{:>5}  {:<24} {:>10} {:>12.4} {:>8.2}",
            rec.class,
            rec.label,
            rec.pixels,
            rec.area / 1e6,
            rec.percentage
        );
    }
    println!(
        "Valid pixels: {}  Total area: {:.4} km2",
        stats.total_valid_pixels,
        stats.total_area / 1e6
    );
}

fn print_areas(areas: &[RangeArea]) {
    for area in areas {
        println!("  {:<16} {:>12.4} km2", area.label, area.area_km2());
    }
}

fn load_inputs(pipeline: &McePipeline, paths: &HashMap<String, PathBuf>) -> Result<HashMap<String, Raster<f64>>> {
    let mut layers = HashMap::new();
    for name in pipeline.required_inputs() {
        let Some(path) = paths.get(name) else {
            bail!("pipeline '{}' needs an input for '{}'", pipeline.name(), name);
        };
        layers.insert(name.to_string(), read_raster(path)?);
    }
    Ok(layers)
}

fn run_pipeline(
    config: PipelineConfig,
    paths: &HashMap<String, PathBuf>,
    region: &Region,
    resolution: Option<f64>,
) -> Result<MceOutput> {
    let pipeline = McePipeline::new(config)?;
    let inputs = load_inputs(&pipeline, paths)?;
    let resolution = match resolution {
        Some(r) => r,
        None => inputs.values().next().map_or(1.0, |r| r.cell_size()),
    };
    let pb = spinner(&format!("Running {}...", pipeline.name()))?;
    let out = pipeline.run(&inputs, region, resolution)?;
    pb.finish_and_clear();
    Ok(out)
}

fn region_from_spec(spec: &RegionSpec) -> Result<Region> {
    Ok(match spec {
        RegionSpec::Full => Region::Full,
        RegionSpec::Bounds(b) => Region::bounds(*b)?,
        RegionSpec::Mask(path) => Region::Mask(read_raster(path)?),
    })
}

fn run_analysis(path: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let analysis = AnalysisConfig::load(path)?;
    let out_dir = output_dir
        .or_else(|| analysis.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("postfire-output"));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let region = region_from_spec(&analysis.region)?;
    let mut report = Report::default();

    if let Some(run) = &analysis.severity {
        let dnbr: Raster<f64> = read_raster(&run.dnbr)?;
        let mut params = SeverityParams { scale: run.scale, ..Default::default() };
        if let Some(ladder) = &run.ladder {
            params.ladder = ladder.clone();
        }
        let out = burn_severity(&dnbr, &params).context("burn severity")?;
        let resolution = run.resolution.or(analysis.sampling_resolution).unwrap_or(10.0);
        let stats = class_statistics(&out.classes, &region, resolution, &params.ladder)
            .context("burn severity class statistics")?;
        print_class_table(&stats);
        write_result(&out.classes, &out_dir.join("burn_severity.tif"))?;
        report.severity = Some(stats);
    }

    for run in &analysis.pipelines {
        let config = run.resolve()?;
        let name = config.name.clone();
        let paths: HashMap<_, _> = run.inputs.clone().into_iter().collect();
        let out = run_pipeline(config, &paths, &region, analysis.sampling_resolution)?;

        println!("{name}: min {:.4}, max {:.4}", out.min, out.max);
        print_areas(&out.areas);
        write_result(&out.composite, &out_dir.join(format!("{name}.tif")))?;
        write_result(&out.normalized, &out_dir.join(format!("{name}_0_100.tif")))?;
        report.pipelines.push(PipelineReport { name, min: out.min, max: out.max, areas: out.areas });
    }

    let report_path = out_dir.join("report.json");
    let file = File::create(&report_path).with_context(|| format!("creating {}", report_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report).context("writing report")?;
    println!("Report saved to: {}", report_path.display());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster: Raster<f64> = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {} ({})", crs, if crs.is_geographic() { "geographic" } else { "projected" });
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        Commands::Severity { input, output, scale, resolution, bounds } => {
            let region = parse_bounds(bounds.as_deref())?;
            let dnbr: Raster<f64> = read_raster(&input)?;
            let resolution = resolution.unwrap_or_else(|| dnbr.cell_size());
            let start = Instant::now();
            let params = SeverityParams { scale, ..Default::default() };
            let out = burn_severity(&dnbr, &params)?;
            let stats = class_statistics(&out.classes, &region, resolution, &params.ladder)?;
            let elapsed = start.elapsed();

            print_class_table(&stats);
            if let Some(path) = output {
                write_result(&out.classes, &path)?;
                done("Burn severity", &path, elapsed);
            }
        }

        Commands::Mce {
            pipeline,
            inputs,
            config,
            weights,
            output,
            normalized_output,
            resolution,
            bounds,
        } => {
            let region = parse_bounds(bounds.as_deref())?;
            let mut pipeline_config = match (config, pipeline) {
                (Some(path), _) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str::<PipelineConfig>(&text)
                        .with_context(|| format!("invalid pipeline configuration {}", path.display()))?
                }
                (None, Some(name)) => presets::preset(&name)?,
                (None, None) => bail!("give a preset name or --config"),
            };
            for (name, weight) in &weights {
                pipeline_config.set_weight(name, *weight)?;
            }

            let paths: HashMap<String, PathBuf> = inputs.into_iter().collect();
            let start = Instant::now();
            let out = run_pipeline(pipeline_config, &paths, &region, resolution)?;
            let elapsed = start.elapsed();

            println!("Composite min: {:.4}  max: {:.4}", out.min, out.max);
            println!("Area by range:");
            print_areas(&out.areas);
            if let Some(path) = output {
                write_result(&out.composite, &path)?;
                done("Composite", &path, elapsed);
            }
            if let Some(path) = normalized_output {
                write_result(&out.normalized, &path)?;
                done("Composite [0, 100]", &path, elapsed);
            }
        }

        Commands::Areas { input, ranges, resolution, bounds } => {
            let region = parse_bounds(bounds.as_deref())?;
            let layer: Raster<f64> = read_raster(&input)?;
            let resolution = resolution.unwrap_or_else(|| layer.cell_size());
            let areas = area_in_ranges(&layer, &region, resolution, &ranges)?;
            print_areas(&areas);
        }

        Commands::Run { config, output_dir } => {
            let start = Instant::now();
            run_analysis(&config, output_dir)?;
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Preset { name } => {
            let config = presets::preset(&name)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        let (k, v) = parse_key_val::<f64>("slope=0.5").unwrap();
        assert_eq!((k.as_str(), v), ("slope", 0.5));
        assert!(parse_key_val::<f64>("slope").is_err());
        assert!(parse_key_val::<f64>("slope=x").is_err());
    }

    #[test]
    fn test_parse_range() {
        let r = parse_range("-1:0.1:very low").unwrap();
        assert_eq!((r.lower, r.upper, r.label.as_str()), (-1.0, 0.1, "very low"));
        assert_eq!(parse_range("0.4:0.6").unwrap().label, "(0.4, 0.6)");
        assert!(parse_range("0.4").is_err());
    }

    #[test]
    fn test_parse_bounds() {
        assert!(matches!(parse_bounds(None).unwrap(), Region::Full));
        assert!(matches!(parse_bounds(Some("0,0,10,10")).unwrap(), Region::Bounds { .. }));
        assert!(parse_bounds(Some("0,0,10")).is_err());
        assert!(parse_bounds(Some("10,0,0,10")).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "postfire", "mce", "soil-erosion", "-i", "slope=slope.tif", "-w", "slope=0.5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Mce { .. }));

        let cli = Cli::try_parse_from(["postfire", "areas", "x.tif", "--range", "-1:0.1:low"]).unwrap();
        assert!(matches!(cli.command, Commands::Areas { .. }));
    }

    #[test]
    fn test_severity_resolution_defaults_to_cell_size() {
        let cli = Cli::try_parse_from(["postfire", "severity", "dnbr.tif"]).unwrap();
        assert!(matches!(cli.command, Commands::Severity { resolution: None, .. }));

        let cli = Cli::try_parse_from(["postfire", "severity", "dnbr.tif", "-r", "30"]).unwrap();
        assert!(matches!(cli.command, Commands::Severity { resolution: Some(r), .. } if r == 30.0));
    }

    #[test]
    fn test_mce_takes_preset_or_config() {
        let cli = Cli::try_parse_from(["postfire", "mce", "--config", "p.json", "-i", "a=a.tif"]).unwrap();
        assert!(matches!(cli.command, Commands::Mce { pipeline: None, config: Some(_), .. }));

        assert!(Cli::try_parse_from(["postfire", "mce", "soil-erosion", "--config", "p.json"]).is_err());
        assert!(Cli::try_parse_from(["postfire", "mce", "-i", "a=a.tif"]).is_err());
    }
}
