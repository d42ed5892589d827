use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{info, warn};
use cloud_sift::binary::BinaryWriter;
use cloud_sift::external_sort::{ExternalSortConfig, ExternalSortProcessor, TextSink};
use cloud_sift::utils::setup_logging;

#[derive(Parser)]
#[command(name = "cloud-sift-encode")]
#[command(about = "Cloud Sift: external-sort point text files by (x, y, z) and encode them as a binary point file")]
#[command(version)]
struct Args {
    #[arg(short, long, required = true, num_args = 1.., help = "Input text files with 'x y z i' lines")]
    input: Vec<PathBuf>,

    #[arg(short, long, help = "Output file")]
    output: PathBuf,

    #[arg(short, long, help = "Sort configuration file (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Write sorted text instead of the binary format")]
    text_only: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(if args.verbose { "verbose" } else { "normal" })?;

    let mut config = match &args.config {
        Some(path) => ExternalSortConfig::from_file(path)?,
        None => ExternalSortConfig::default(),
    };
    if args.verbose {
        config.verbose = true;
    }

    for input in &args.input {
        if !input.is_file() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, aborting sort");
            shutdown_flag_clone.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    let total_size: u64 = args.input.iter()
        .filter_map(|f| std::fs::metadata(f).ok())
        .map(|m| m.len())
        .sum();
    info!("Sorting {} input files ({:.2} MB) into {}",
        args.input.len(),
        total_size as f64 / (1024.0 * 1024.0),
        args.output.display()
    );

    let start_time = Instant::now();
    let mut processor = ExternalSortProcessor::new(config)?
        .with_shutdown_signal(shutdown_flag);

    let stats = if args.text_only {
        let mut sink = TextSink::create(&args.output)?;
        let stats = processor.process(&args.input, &mut sink).await?;
        info!("Sorted text written to {}", sink.destination().display());
        stats
    } else {
        let mut sink = BinaryWriter::create(&args.output)?;
        processor.process(&args.input, &mut sink).await?
    };
    let total_time = start_time.elapsed();

    println!("Records written:  {}", stats.records_written);
    println!("Files processed:  {}", stats.files_processed);
    println!("Chunks created:   {}", stats.chunks_created);
    println!("Sort time:        {:.2}s", stats.sort_time_ms as f64 / 1000.0);
    println!("Merge time:       {:.2}s", stats.merge_time_ms as f64 / 1000.0);
    println!("Total time:       {:.2}s", total_time.as_secs_f64());

    Ok(())
}
