//! # mztrace CLI
//!
//! A command-line tool for building chromatograms (mass traces) from
//! centroided mass spectrometry scans.
//!
//! ## Usage
//!
//! ```bash
//! # Build chromatograms from a TSV scan file
//! mztrace build input.tsv -o chromatograms.json \
//!     --min-scan-span 6.0 --intensity-threshold 1000 --start-intensity 5000
//!
//! # Same, with the policy values in a config file
//! mztrace build input.tsv --config mztrace.toml
//!
//! # Generate synthetic LC-MS data and run construction on it
//! mztrace demo demo_chromatograms.json
//!
//! # Summarize a scan file without running construction
//! mztrace info input.tsv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use mztrace::builder::{BuilderParams, ChromatogramBuilder};
use mztrace::export::write_peak_list;
use mztrace::reader::read_scans;
use mztrace::spectrum::{Scan, ScanBuilder};
use mztrace::tolerance::MzTolerance;

mod config;
use config::Config;

/// mztrace - Chromatogram Construction from Centroided Scans
#[derive(Parser)]
#[command(name = "mztrace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build chromatograms from a scan file and export the peak list
    Build {
        /// Input scan file (.tsv/.txt tab-separated, .csv comma-separated)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output peak-list JSON path (defaults to <input>.chromatograms.json)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Minimum continuous retention-time span a trace must hold above
        /// the intensity threshold to be kept (same units as the input's rt)
        #[arg(long)]
        min_scan_span: Option<f64>,

        /// Intensity required for a point to extend a trace and count
        /// toward the span
        #[arg(long)]
        intensity_threshold: Option<f64>,

        /// Intensity required for a point to start a new trace
        #[arg(long)]
        start_intensity: Option<f64>,

        /// Absolute m/z tolerance (default 0.001); the wider of --mz and
        /// --ppm applies
        #[arg(long)]
        mz: Option<f64>,

        /// Relative m/z tolerance in ppm (default 5.0)
        #[arg(long)]
        ppm: Option<f64>,

        /// TOML file supplying any of the above values (explicit flags win)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Generate synthetic LC-MS data and run construction on it
    Demo {
        /// Output peak-list JSON path
        #[arg(value_name = "OUTPUT", default_value = "demo_chromatograms.json")]
        output: PathBuf,

        /// Number of scans to generate
        #[arg(long, default_value = "240")]
        scans: usize,

        /// Number of eluting ion species to simulate
        #[arg(long, default_value = "24")]
        species: usize,
    },

    /// Display information about a scan file
    Info {
        /// Input scan file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Build {
            input,
            output,
            min_scan_span,
            intensity_threshold,
            start_intensity,
            mz,
            ppm,
            config,
        } => {
            let params = resolve_params(
                min_scan_span,
                intensity_threshold,
                start_intensity,
                mz,
                ppm,
                config.as_deref(),
            )?;
            run_build(input, output, params)
        }
        Commands::Demo {
            output,
            scans,
            species,
        } => run_demo(output, scans, species),
        Commands::Info { file } => run_info(file),
    }
}

/// Merge CLI flags with an optional config file; flags win. The three
/// required policies must come from one of the two sources; the tolerance
/// falls back to the 0.001 / 5 ppm defaults.
fn resolve_params(
    min_scan_span: Option<f64>,
    intensity_threshold: Option<f64>,
    start_intensity: Option<f64>,
    mz: Option<f64>,
    ppm: Option<f64>,
    config_path: Option<&std::path::Path>,
) -> Result<BuilderParams> {
    let file = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let require = |flag: Option<f64>, from_file: Option<f64>, name: &str| {
        flag.or(from_file).with_context(|| {
            format!("Missing required parameter --{name} (set it on the command line or in a config file)")
        })
    };

    let defaults = MzTolerance::default();
    let tolerance = MzTolerance::new(
        mz.or(file.build.mz).unwrap_or(defaults.absolute),
        ppm.or(file.build.ppm).unwrap_or(defaults.ppm),
    );

    let params = BuilderParams {
        mz_tolerance: tolerance,
        start_intensity: require(start_intensity, file.build.start_intensity, "start-intensity")?,
        intensity_threshold: require(
            intensity_threshold,
            file.build.intensity_threshold,
            "intensity-threshold",
        )?,
        min_scan_span: require(min_scan_span, file.build.min_scan_span, "min-scan-span")?,
    };

    params.validate().context("Invalid parameter values")?;
    Ok(params)
}

/// Build chromatograms from a scan file and export the peak list
fn run_build(input: PathBuf, output: Option<PathBuf>, params: BuilderParams) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let output = output.unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        input.with_file_name(format!("{}.chromatograms.json", stem))
    });

    info!("mztrace - chromatogram construction");
    info!("===================================");
    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    info!(
        "Tolerance: {} m/z / {} ppm",
        params.mz_tolerance.absolute, params.mz_tolerance.ppm
    );
    info!("Start intensity: {}", params.start_intensity);
    info!("Intensity threshold: {}", params.intensity_threshold);
    info!("Min scan span: {}", params.min_scan_span);

    let scans = read_scans(&input)
        .with_context(|| format!("Failed to read scan file: {}", input.display()))?;
    info!("Read {} scans", scans.len());

    let chromatograms = construct(&scans, params)?;

    let stats = write_peak_list(&output, &chromatograms, params)
        .with_context(|| format!("Failed to write peak list: {}", output.display()))?;
    info!("{}", stats);

    println!(
        "{} chromatograms written to {}",
        chromatograms.len(),
        output.display()
    );

    Ok(())
}

/// Generate synthetic LC-MS data, run construction, export the result
fn run_demo(output: PathBuf, num_scans: usize, num_species: usize) -> Result<()> {
    info!("mztrace demo - synthetic LC-MS run");
    info!("==================================");
    info!("Scans: {}, species: {}", num_scans, num_species);

    let scans = generate_mock_run(num_scans, num_species);
    info!(
        "Generated {} scans ({} points)",
        scans.len(),
        scans.iter().map(|s| s.point_count()).sum::<usize>()
    );

    // Policies tuned for the synthetic data: the noise floor sits around
    // 50-200 counts, real species peak between 1e4 and 1e6.
    let params = BuilderParams {
        mz_tolerance: MzTolerance::new(0.01, 10.0),
        start_intensity: 5_000.0,
        intensity_threshold: 1_000.0,
        min_scan_span: 4.0,
    };

    let chromatograms = construct(&scans, params)?;

    let stats = write_peak_list(&output, &chromatograms, params)
        .with_context(|| format!("Failed to write peak list: {}", output.display()))?;
    info!("{}", stats);

    println!(
        "{} chromatograms written to {}",
        chromatograms.len(),
        output.display()
    );

    Ok(())
}

/// Display information about a scan file
fn run_info(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let scans = read_scans(&file)
        .with_context(|| format!("Failed to read scan file: {}", file.display()))?;

    println!("Scan File Information");
    println!("=====================");
    println!("File: {}", file.display());
    println!();
    println!("Scans: {}", scans.len());
    println!(
        "Points: {}",
        scans.iter().map(|s| s.point_count()).sum::<usize>()
    );

    if let (Some(first), Some(last)) = (scans.first(), scans.last()) {
        println!(
            "Retention time range: {:.3} - {:.3}",
            first.retention_time, last.retention_time
        );
    }
    if let Some(max_tic) = scans
        .iter()
        .map(|s| s.total_ion_current())
        .reduce(f64::max)
    {
        println!("Max total ion current: {:.1}", max_tic);
    }

    Ok(())
}

/// Drive the builder over a scan slice. `finish` logs the run statistics.
fn construct(
    scans: &[Scan],
    params: BuilderParams,
) -> Result<Vec<mztrace::builder::Chromatogram>> {
    let mut builder = ChromatogramBuilder::new(params).context("Invalid parameters")?;
    for scan in scans {
        builder
            .process_scan(scan)
            .context("Chromatogram construction failed")?;
    }
    Ok(builder.finish().0)
}

/// Generate a mock LC-MS run: Gaussian elution profiles over a noise floor.
///
/// Fully deterministic (sin-derived pseudo-noise), so repeated demo runs
/// produce identical output.
fn generate_mock_run(num_scans: usize, num_species: usize) -> Vec<Scan> {
    let run_duration = num_scans as f64 * 0.5; // one scan every 0.5 time units
    let mut scans = Vec::with_capacity(num_scans);

    for scan_index in 0..num_scans {
        let rt = scan_index as f64 * 0.5;
        let mut builder = ScanBuilder::new(scan_index, rt);

        // Eluting species: each a Gaussian in time at a fixed m/z
        for s in 0..num_species {
            let frac = (s as f64 + 0.5) / num_species as f64;
            let mz = 150.0 + frac * 750.0 + (s as f64 * 0.731).sin() * 3.0;
            let apex_rt = run_duration * (0.1 + 0.8 * frac);
            let width = 3.0 + (s as f64 * 0.417).sin().abs() * 4.0;
            let height = 1e4 + (s as f64 * 0.291).sin().abs() * 9.9e5;

            let z = (rt - apex_rt) / width;
            let intensity = height * (-0.5 * z * z).exp();
            if intensity > 10.0 {
                // Small deterministic mass jitter, well inside tolerance
                let jitter = ((scan_index as f64 * 0.57 + s as f64).sin()) * 0.002;
                builder = builder.add_point(mz + jitter, intensity);
            }
        }

        // Noise floor: a handful of weak points scattered over the mass range
        for n in 0..12 {
            let seed = scan_index as f64 * 1.37 + n as f64 * 7.91;
            let mz = 150.0 + (seed.sin().abs()) * 750.0;
            let intensity = 50.0 + (seed.cos().abs()) * 150.0;
            builder = builder.add_point(mz, intensity);
        }

        scans.push(builder.build());
    }

    scans
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_flags_alone_resolve_with_default_tolerance() {
        let params =
            resolve_params(Some(4.0), Some(1_000.0), Some(5_000.0), None, None, None).unwrap();
        assert_eq!(params.min_scan_span, 4.0);
        assert_eq!(params.intensity_threshold, 1_000.0);
        assert_eq!(params.start_intensity, 5_000.0);
        assert_eq!(params.mz_tolerance, MzTolerance::default());
    }

    #[test]
    fn test_flag_wins_over_config_file() {
        let file = config_file(
            r#"
            [build]
            min_scan_span = 9.0
            intensity_threshold = 111.0
            start_intensity = 222.0
            mz = 0.5
            "#,
        );

        let params =
            resolve_params(Some(4.0), None, None, None, Some(20.0), Some(file.path())).unwrap();

        // Explicit flags win over the file
        assert_eq!(params.min_scan_span, 4.0);
        assert_eq!(params.mz_tolerance.ppm, 20.0);
        // Values with no flag fall back to the file
        assert_eq!(params.intensity_threshold, 111.0);
        assert_eq!(params.start_intensity, 222.0);
        assert_eq!(params.mz_tolerance.absolute, 0.5);
    }

    #[test]
    fn test_config_file_alone_suffices() {
        let file = config_file(
            r#"
            [build]
            min_scan_span = 6.0
            intensity_threshold = 1000.0
            start_intensity = 5000.0
            "#,
        );

        let params = resolve_params(None, None, None, None, None, Some(file.path())).unwrap();
        assert_eq!(params.min_scan_span, 6.0);
        assert_eq!(params.intensity_threshold, 1_000.0);
        assert_eq!(params.start_intensity, 5_000.0);
        // Tolerance absent from both sources: defaults apply
        assert_eq!(params.mz_tolerance, MzTolerance::default());
    }

    #[test]
    fn test_missing_required_parameter_is_error() {
        let file = config_file(
            r#"
            [build]
            min_scan_span = 6.0
            intensity_threshold = 1000.0
            "#,
        );

        let err = resolve_params(None, None, None, None, None, Some(file.path()))
            .err()
            .expect("must fail");
        assert!(format!("{err:#}").contains("start-intensity"));
    }

    #[test]
    fn test_missing_parameter_without_config_is_error() {
        let err = resolve_params(None, Some(1_000.0), Some(5_000.0), None, None, None)
            .err()
            .expect("must fail");
        assert!(format!("{err:#}").contains("min-scan-span"));
    }
}
