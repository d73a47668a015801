//! `svgdrawable`: convert SVG files into Android VectorDrawable XML.

use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use svgdrawable::{Conversion, ConvertError, Converter};

#[derive(Parser)]
#[command(version, about = "Convert SVG documents to Android VectorDrawable XML")]
struct Cli {
    /// SVG files to convert
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Directory for the generated files (default: next to each input)
    #[arg(short = 'o', long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Output file; only valid with a single input
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Multiplier for android:width and android:height
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Fixed number of fractional digits in path data
    #[arg(long, value_name = "N")]
    digits: Option<usize>,

    /// Write a JSONL developer log
    #[arg(long = "debug-log", value_name = "FILE")]
    debug_log: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        Cli::command()
            .error(
                ErrorKind::ArgumentConflict,
                "--output can only be used with a single input",
            )
            .exit();
    }

    let mut builder = Converter::builder()
        .scale_factor(cli.scale)
        .coordinate_digits(cli.digits);
    if let Some(path) = &cli.debug_log {
        builder = builder.debug_log(path);
    }
    let converter = match builder.build() {
        Ok(converter) => converter,
        Err(err) => {
            eprintln!("[svgdrawable] {err}");
            process::exit(2);
        }
    };

    let jobs: Vec<(PathBuf, PathBuf)> = cli
        .inputs
        .iter()
        .map(|input| {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| output_path(input, cli.out_dir.as_deref()));
            (input.clone(), output)
        })
        .collect();

    if let Some(dir) = &cli.out_dir {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("[svgdrawable] cannot create {}: {err}", dir.display());
            process::exit(1);
        }
    }

    let results = converter.convert_many(&jobs);
    let mut failed = false;
    for ((input, output), result) in jobs.iter().zip(results) {
        failed |= !report(input, output, result, cli.quiet);
    }
    process::exit(i32::from(failed));
}

/// `name.svg` becomes `name.xml`, in `out_dir` when given.
fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let file_name = input
        .file_stem()
        .map(|stem| format!("{}.xml", stem.to_string_lossy()))
        .unwrap_or_else(|| "drawable.xml".to_string());
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

// Returns true when the input converted without errors.
fn report(
    input: &Path,
    output: &Path,
    result: Result<Conversion, ConvertError>,
    quiet: bool,
) -> bool {
    let conversion = match result {
        Ok(conversion) => conversion,
        Err(err) => {
            eprintln!("[svgdrawable] {}: {err}", input.display());
            return false;
        }
    };
    for line in conversion.diagnostics.lines() {
        if quiet && !line.starts_with("ERROR") {
            continue;
        }
        eprintln!("[svgdrawable] {}: {line}", input.display());
    }
    if !quiet && conversion.has_output() {
        eprintln!("[svgdrawable] wrote {}", output.display());
    }
    !conversion.has_errors
}
