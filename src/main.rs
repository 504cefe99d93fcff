use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use line_sift::utils::{format_bytes, format_duration_ms, percentage, setup_logging};
use line_sift::constants::VERBOSITY_VERBOSE;
use line_sift::{SiftConfig, SiftProcessor};

#[derive(Parser)]
#[command(name = "line-sift")]
#[command(about = "🧹 Line Sift: partitions huge line lists into prefix buckets and merges a clean, deduplicated file")]
#[command(version)]
struct Args {
    #[arg(short, long, help = "Directory containing the line files (defaults to the config value)")]
    input: Option<PathBuf>,

    #[arg(short, long, help = "Scratch directory for bucket files (defaults to <input>/temp)")]
    scratch: Option<PathBuf>,

    #[arg(short, long, help = "Name of the output file written into the input directory")]
    output_name: Option<String>,

    #[arg(short, long, default_value = "line_sift_config.json", help = "Configuration file")]
    config: PathBuf,

    #[arg(long, help = "Longest accepted line in bytes")]
    max_line_bytes: Option<usize>,

    #[arg(long, help = "How many input files are read at the same time")]
    max_concurrent_files: Option<usize>,

    #[arg(long, help = "Bucket files kept open at the same time")]
    max_open_buckets: Option<usize>,

    #[arg(long, help = "Keep every non-empty line, skipping the address rules")]
    accept_all: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut SiftConfig) {
        if let Some(input) = &self.input {
            config.io.input_directory = input.clone();
        }
        if let Some(scratch) = &self.scratch {
            config.io.scratch_directory = Some(scratch.clone());
        }
        if let Some(output_name) = &self.output_name {
            config.io.output_file_name = output_name.clone();
        }
        if let Some(max_line_bytes) = self.max_line_bytes {
            config.processing.max_line_bytes = max_line_bytes;
        }
        if let Some(max_concurrent_files) = self.max_concurrent_files {
            config.processing.max_concurrent_files = max_concurrent_files;
        }
        if let Some(max_open_buckets) = self.max_open_buckets {
            config.processing.max_open_buckets = max_open_buckets;
        }
        if self.accept_all {
            config.classifier.accept_all = true;
        }
        if self.verbose {
            config.logging.verbosity = VERBOSITY_VERBOSE.to_string();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        SiftConfig::from_file(&args.config)?
    } else {
        println!("📄 Config file not found, creating default: {}", args.config.display());
        let default_config = SiftConfig::default();
        default_config.to_file(&args.config)?;
        default_config
    };

    args.apply_to(&mut config);

    setup_logging(&config.logging.verbosity)?;

    if !config.io.input_directory.is_dir() {
        return Err(anyhow::anyhow!(
            "Input directory does not exist: {}",
            config.io.input_directory.display()
        ));
    }

    println!("🧙 Line Sift");
    println!("🔍 Input: {}", config.io.input_directory.display());
    println!("📝 Output: {}", config.output_path().display());

    let start_time = Instant::now();
    let processor = SiftProcessor::from_config(config)?;
    let stats = processor.process().await?;
    let total_ms = start_time.elapsed().as_millis() as u64;

    let output_size = std::fs::metadata(&stats.output_file)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("\n🎉 Processing completed successfully! 🎉");
    println!("=======================================");
    println!("📁 Files processed: {} of {}", stats.files_processed, stats.files_discovered);
    if stats.files_failed > 0 {
        println!("⚠️ Files with errors: {}", stats.files_failed);
    }
    println!("📊 Lines read: {}", stats.lines_read);
    println!("✅ Lines accepted: {}", stats.lines_accepted);
    println!("🚫 Lines rejected: {} ({:.2}%)",
        stats.lines_rejected,
        percentage(stats.lines_rejected, stats.lines_read)
    );
    if stats.invalid_utf8_lines > 0 || stats.write_errors > 0 {
        println!("⚠️ Invalid UTF-8 lines: {}, dropped by write errors: {}",
            stats.invalid_utf8_lines, stats.write_errors);
    }
    println!("📦 Buckets: {} created, {} merged, {} failed",
        stats.buckets_created, stats.buckets_merged, stats.buckets_failed);
    if stats.buckets_incomplete > 0 {
        println!("⚠️ Buckets merged from partially flushed files: {}",
            stats.buckets_incomplete);
    }
    println!("✨ Unique lines: {}", stats.unique_lines);
    println!("🗑️ Duplicates removed: {} ({:.2}%)",
        stats.duplicates_removed,
        percentage(stats.duplicates_removed, stats.lines_accepted)
    );
    println!("⏱️ Fan-out: {}, merge: {}, total: {}",
        format_duration_ms(stats.fan_out_time_ms),
        format_duration_ms(stats.merge_time_ms),
        format_duration_ms(total_ms)
    );
    println!("📜 Output written to: {} ({})",
        stats.output_file.display(),
        format_bytes(output_size)
    );

    Ok(())
}
