use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use cloud_sift::binary::dump_to_text;
use cloud_sift::constants::DEFAULT_BLOCK_SIZE_BYTES;
use cloud_sift::utils::setup_logging;

#[derive(Parser)]
#[command(name = "cloud-sift-dump")]
#[command(about = "Cloud Sift: convert a binary point file back to 'x y z i' text")]
#[command(version)]
struct Args {
    #[arg(help = "Binary point file")]
    input: PathBuf,

    #[arg(help = "Text output file")]
    output: PathBuf,

    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE_BYTES, help = "Block size in bytes")]
    block_size: usize,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(if args.verbose { "verbose" } else { "normal" })?;

    let records = dump_to_text(&args.input, &args.output, args.block_size)?;
    println!("Dumped {} records to {}", records, args.output.display());

    Ok(())
}
