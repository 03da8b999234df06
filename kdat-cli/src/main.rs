//! KDAT CLI - folder archiver producing `.kdat` containers.
//!
//! Packs a directory tree into a single archive (LZSS + Huffman payloads,
//! raw storage when compression does not pay off) and unpacks it again.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use kdat_archive::{
    collect_files, compress_dir, decompress_archive, read_archive_index, ArchiveStats, Storage,
    EXTENSION, MAX_ORIGIN_BYTES,
};
use kdat_core::profile::CompressionProfile;

#[derive(Parser)]
#[command(name = "kdat")]
#[command(
    author,
    version,
    about = "KDAT archiver - pack a folder into a .kdat archive and back"
)]
#[command(long_about = "
KDAT packs a directory tree into a single .kdat container. Each file is
stored either raw or LZSS+Huffman compressed, whichever is smaller.

Examples:
  kdat compress assets/ assets.kdat
  kdat compress assets/ assets.kdat --mode archive
  kdat decompress assets.kdat restored/
  kdat info assets.kdat
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a folder into a new .kdat archive
    #[command(alias = "c")]
    Compress {
        /// Folder to pack
        origin: PathBuf,

        /// Archive file to create (must end in .kdat and must not exist)
        target: PathBuf,

        /// Compression mode preset
        #[arg(short, long, value_enum, default_value = "fastest")]
        mode: Mode,

        /// Override the sliding-window size in bytes (4096-8388608,
        /// multiple of 4; invalid values fall back to 4096)
        #[arg(long)]
        window_size: Option<usize>,

        /// Override the lookahead (clamped to 18-255)
        #[arg(long)]
        lookahead: Option<usize>,

        /// Print each packed file
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decompress a .kdat archive into an existing folder
    #[command(alias = "dc")]
    Decompress {
        /// Archive file to unpack
        origin: PathBuf,

        /// Existing folder to unpack into
        target: PathBuf,

        /// Print each extracted file
        #[arg(short, long)]
        verbose: bool,
    },

    /// List an archive's records without extracting
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },
}

/// Compression mode preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum Mode {
    /// 4 KiB window, lookahead 18
    #[default]
    Fastest,
    /// 32 KiB window, lookahead 32
    Fast,
    /// 256 KiB window, lookahead 64
    Balanced,
    /// 1 MiB window, lookahead 128
    Slow,
    /// 8 MiB window, lookahead 255
    Archive,
}

impl Mode {
    fn profile(self) -> CompressionProfile {
        match self {
            Self::Fastest => CompressionProfile::FASTEST,
            Self::Fast => CompressionProfile::FAST,
            Self::Balanced => CompressionProfile::BALANCED,
            Self::Slow => CompressionProfile::SLOW,
            Self::Archive => CompressionProfile::ARCHIVE,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            origin,
            target,
            mode,
            window_size,
            lookahead,
            verbose,
        } => cmd_compress(&origin, &target, mode, window_size, lookahead, verbose),
        Commands::Decompress {
            origin,
            target,
            verbose,
        } => cmd_decompress(&origin, &target, verbose),
        Commands::Info { archive } => cmd_info(&archive),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

fn cmd_compress(
    origin: &Path,
    target: &Path,
    mode: Mode,
    window_size: Option<usize>,
    lookahead: Option<usize>,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    // Preconditions the core skips by contract.
    if !origin.is_dir() {
        return Err(format!("origin '{}' is not a folder", origin.display()).into());
    }
    if target.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        return Err(format!("target '{}' must end in .kdat", target.display()).into());
    }
    if target.exists() {
        return Err(format!("target '{}' already exists", target.display()).into());
    }
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(format!("target folder '{}' does not exist", parent.display()).into());
        }
    }

    let files = collect_files(origin)?;
    if files.is_empty() {
        return Err(format!("origin '{}' contains no files to compress", origin.display()).into());
    }
    let mut origin_bytes = 0u64;
    for file in &files {
        origin_bytes += fs::metadata(file)?.len();
    }
    if origin_bytes > MAX_ORIGIN_BYTES {
        return Err(format!(
            "origin '{}' is {} bytes; archives above {} bytes (5 GiB) are not supported",
            origin.display(),
            origin_bytes,
            MAX_ORIGIN_BYTES
        )
        .into());
    }

    let mut profile = mode.profile();
    if let Some(window_size) = window_size {
        profile.set_window_size(window_size);
    }
    if let Some(lookahead) = lookahead {
        profile.set_lookahead(lookahead);
    }

    println!(
        "Compressing '{}' to '{}' ({}, window {} bytes, lookahead {})",
        origin.display(),
        target.display(),
        profile,
        profile.window_size(),
        profile.lookahead()
    );

    let start = Instant::now();
    let pb = create_progress_bar(files.len() as u64);
    pb.set_message("files");

    let stats = compress_dir(origin, target, &profile, |rel| {
        if verbose {
            pb.println(format!("  Packed: {rel}"));
        }
        pb.inc(1);
    })?;
    pb.finish_with_message("Done");

    print_report("compressing", origin, target, &stats, start, verbose);
    Ok(())
}

fn cmd_decompress(origin: &Path, target: &Path, verbose: bool) -> Result<(), Box<dyn Error>> {
    if !origin.is_file() {
        return Err(format!("origin '{}' is not a file", origin.display()).into());
    }
    if origin.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        return Err(format!("origin '{}' is not a .kdat archive", origin.display()).into());
    }
    if !target.is_dir() {
        return Err(format!("target '{}' is not an existing folder", target.display()).into());
    }

    println!(
        "Decompressing '{}' to '{}'",
        origin.display(),
        target.display()
    );

    let start = Instant::now();
    let record_count = read_archive_index(origin)?.len();
    let pb = create_progress_bar(record_count as u64);
    pb.set_message("files");

    let stats = decompress_archive(origin, target, |rel| {
        if verbose {
            pb.println(format!("  Extracted: {rel}"));
        }
        pb.inc(1);
    })?;
    pb.finish_with_message("Done");

    print_report("decompressing", origin, target, &stats, start, verbose);
    Ok(())
}

fn print_report(
    action: &str,
    origin: &Path,
    target: &Path,
    stats: &ArchiveStats,
    start: Instant,
    verbose: bool,
) {
    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
    let mbps = stats.original_bytes as f64 / (1024.0 * 1024.0) / elapsed;
    let saved = if stats.original_bytes > 0 {
        100.0 - (stats.archive_bytes as f64 / stats.original_bytes as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Finished {action} '{}' to '{}'!",
        origin.display(),
        target.display()
    );
    println!("  - folder size: {} bytes", stats.original_bytes);
    println!("  - archive size: {} bytes", stats.archive_bytes);
    println!("  - space saved: {saved:.2}%");
    println!("  - throughput: {mbps:.2} MB/s");
    if verbose {
        println!("  - total files: {}", stats.files);
        println!("  - compressed: {}", stats.compressed);
        println!("  - stored raw: {}", stats.raw);
        println!("  - empty: {}", stats.empty);
    }
    println!("  - duration: {elapsed:.2} seconds");
}

fn cmd_info(archive: &Path) -> Result<(), Box<dyn Error>> {
    let records = read_archive_index(archive)?;
    let archive_bytes = fs::metadata(archive)?.len();

    println!("Archive: {} ({} bytes)", archive.display(), archive_bytes);
    println!();
    println!(
        "{:>12} {:>12} {:>7} {:>10}  Name",
        "Size", "Stored", "Ratio", "Method"
    );
    println!("{}", "-".repeat(60));

    let mut total_original = 0u64;
    let mut total_stored = 0u64;
    for record in &records {
        let ratio = if record.original_size > 0 {
            format!(
                "{:.1}%",
                100.0 - (record.stored_size as f64 / record.original_size as f64) * 100.0
            )
        } else {
            "-".to_string()
        };
        let method = match record.storage {
            Storage::Raw if record.original_size == 0 => "empty",
            Storage::Raw => "raw",
            Storage::Compressed => "compressed",
        };
        println!(
            "{:>12} {:>12} {:>7} {:>10}  {}",
            record.original_size, record.stored_size, ratio, method, record.path
        );
        total_original += record.original_size;
        total_stored += record.stored_size;
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>12} {:>12}          {} files",
        total_original,
        total_stored,
        records.len()
    );
    Ok(())
}
