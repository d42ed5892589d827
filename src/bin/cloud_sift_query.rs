use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use cloud_sift::query::{run_query, QueryConfig, TargetVariable};
use cloud_sift::utils::setup_logging;

#[derive(Parser)]
#[command(name = "cloud-sift-query")]
#[command(about = "Cloud Sift: range statistics over a sorted binary point file with a bounded memory budget")]
#[command(version)]
struct Args {
    #[arg(help = "Sorted binary point file")]
    file: PathBuf,

    #[arg(short, long, help = "Query configuration file (JSON); flags override its values")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Memory budget in bytes")]
    memory: Option<usize>,

    #[arg(short, long, help = "Block size in bytes")]
    block_size: Option<usize>,

    #[arg(long, allow_hyphen_values = true)]
    min_x: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    max_x: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    min_y: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    max_y: Option<f64>,

    #[arg(long, help = "Histogram bin width")]
    bin_width: Option<f64>,

    #[arg(short, long, value_enum, help = "Target variable: z or intensity (i)")]
    target: Option<TargetVariable>,

    #[arg(long, help = "Print the report as JSON")]
    json: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

impl Args {
    fn query_config(&self) -> Result<QueryConfig> {
        let mut config = match &self.config {
            Some(path) => QueryConfig::from_file(path)?,
            None => QueryConfig::default(),
        };

        if let Some(memory) = self.memory {
            config.memory_budget_bytes = memory;
        }
        if let Some(block_size) = self.block_size {
            config.block_size_bytes = block_size;
        }
        if let Some(v) = self.min_x {
            config.min_x = v;
        }
        if let Some(v) = self.max_x {
            config.max_x = v;
        }
        if let Some(v) = self.min_y {
            config.min_y = v;
        }
        if let Some(v) = self.max_y {
            config.max_y = v;
        }
        if let Some(v) = self.bin_width {
            config.bin_width = v;
        }
        if let Some(target) = self.target {
            config.target = target;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(if args.verbose { "verbose" } else { "silent" })?;

    let config = args.query_config()?;
    let report = run_query(&args.file, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(())
}
