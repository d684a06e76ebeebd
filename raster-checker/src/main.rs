use anyhow::{bail, Error as AnyError};
use clap::Parser;
use raster_checker_rs::report::{render_html, render_text};
use raster_checker_rs::source::source_types;
use raster_checker_rs::{ComparisonResult, RasterChecker};

/// raster-checker: validate that two raster sources describe the same content
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path or URI of the raster to verify
    #[clap(short, long)]
    pub verified: String,

    /// Source type of the verified raster. One of asciigrid, png
    #[clap(long, default_value = "asciigrid")]
    pub verified_type: String,

    /// Path or URI of the reference raster
    #[clap(short, long)]
    pub expected: String,

    /// Source type of the reference raster. One of asciigrid, png
    #[clap(long, default_value = "asciigrid")]
    pub expected_type: String,

    /// Report format. One of text, html, json
    #[clap(short, long, default_value = "text")]
    pub format: String,

    /// Path of the report file to be created (stdout when omitted)
    #[clap(short, long)]
    pub output: Option<String>,
}

fn render_report(result: &ComparisonResult, format: &str) -> Result<String, AnyError> {
    match format {
        "text" => Ok(render_text(result)),
        "html" => Ok(render_html(result)),
        "json" => Ok(serde_json::to_string_pretty(result)?),
        other => bail!("Invalid report format: {} (expected text, html or json)", other),
    }
}

fn main() {
    env_logger::init();
    let args: Args = Args::parse();

    for source_type in [&args.verified_type, &args.expected_type] {
        if !source_types().contains(&source_type.as_str()) {
            eprintln!(
                "Unknown source type: {} (available: {})",
                source_type,
                source_types().join(", ")
            );
            std::process::exit(2);
        }
    }

    let checker = RasterChecker::new();
    let result = checker.run_test(
        &args.verified_type,
        &args.verified,
        &args.expected_type,
        &args.expected,
    );

    let report = match render_report(&result, &args.format) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, &report) {
                eprintln!("Failed to write report to {}\n{}", path, err);
                std::process::exit(2);
            }
        }
        None => println!("{}", report),
    }

    std::process::exit(if result.passed() { 0 } else { 1 });
}
