use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pfp_dap::{BuildConfig, DocumentBoundaries, IndexFiles, PrefixFreeParse, build_index};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pfp-dap")]
#[command(about = "Run-length BWT, SA samples, LCP and document array profiles via prefix-free parsing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index files for a set of documents
    Build {
        /// Document files, one document each (line breaks are dropped)
        #[arg(required = true)]
        docs: Vec<PathBuf>,

        /// Output prefix
        #[arg(short, long)]
        output: PathBuf,

        /// Trigger window length
        #[arg(short, long, default_value_t = 10)]
        window: usize,

        /// Trigger modulus: a window is a trigger when its hash is divisible by it
        #[arg(short = 'p', long, default_value_t = 100)]
        modulus: u64,

        /// Write the BWT as plain bytes instead of run heads and lengths
        #[arg(long)]
        no_rle: bool,

        /// Prefix for scratch files (defaults to the output prefix)
        #[arg(long)]
        tmp_prefix: Option<PathBuf>,

        /// Capacity in bytes of each scratch file
        #[arg(long)]
        scratch_bytes: Option<u64>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Summarize the index files of a prefix
    Inspect {
        /// Output prefix given to `build`
        prefix: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            docs,
            output,
            window,
            modulus,
            no_rle,
            tmp_prefix,
            scratch_bytes,
            quiet,
        } => {
            let config = BuildConfig {
                run_length_encode: !no_rle,
                scratch_capacity: scratch_bytes,
                temp_prefix: tmp_prefix,
                verbose: !quiet,
            };
            run_build(&docs, &output, window, modulus, &config)?;
        }
        Commands::Inspect { prefix } => {
            inspect(&prefix)?;
        }
    }

    Ok(())
}

fn run_build(paths: &[PathBuf], output: &Path, window: usize, modulus: u64, config: &BuildConfig) -> Result<()> {
    let mut docs = DocumentBoundaries::new();
    for path in paths {
        let content = read_document(path)?;
        docs.add_document(&content)
            .with_context(|| format!("Invalid document {}", path.display()))?;
    }

    let start = Instant::now();
    if config.verbose {
        eprintln!(
            "Parsing {} bytes from {} documents (w = {}, p = {})",
            docs.text().len(),
            paths.len(),
            window,
            modulus
        );
    }
    let parse = PrefixFreeParse::build(docs.text(), window, modulus)?;
    if config.verbose {
        eprintln!(
            "Parsed into {} phrases ({} distinct) in {:.2?}",
            parse.parse().len(),
            parse.num_phrases(),
            start.elapsed()
        );
    }

    let stats = build_index(&parse, &docs, output, config)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Read a document, dropping line breaks
fn read_document(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(strip_line_breaks(&raw))
}

fn strip_line_breaks(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut start = 0;
    for end in memchr::memchr_iter(b'\n', raw) {
        let line = &raw[start..end];
        out.extend_from_slice(line.strip_suffix(b"\r").unwrap_or(line));
        start = end + 1;
    }
    let tail = &raw[start..];
    out.extend_from_slice(tail.strip_suffix(b"\r").unwrap_or(tail));
    out
}

fn inspect(prefix: &Path) -> Result<()> {
    let files = IndexFiles::open(prefix)?;
    let runs = files.runs();
    let start_profiles = files.start_profiles();
    let end_profiles = files.end_profiles();

    println!("Index: {}", prefix.display());
    println!("  Positions: {}", files.len());
    println!("  Documents: {}", files.num_docs());
    println!(
        "  BWT runs: {} ({})",
        runs.len(),
        if files.is_run_length_encoded() { "run-length encoded" } else { "plain" }
    );
    if !runs.is_empty() {
        println!("  Mean run length: {:.2}", files.len() as f64 / runs.len() as f64);
    }
    println!("  Start samples: {}", files.start_samples().len());
    println!("  End samples: {}", files.end_samples().len());
    println!("  Start profiles: {}", start_profiles.len());
    println!("  End profiles: {}", end_profiles.len());
    if let Some(max) = files.lcp().iter().max() {
        println!("  Max LCP: {}", max);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_breaks() {
        assert_eq!(strip_line_breaks(b"ACGT\nTTGA\r\nCC"), b"ACGTTTGACC");
        assert_eq!(strip_line_breaks(b"ACGT\n"), b"ACGT");
        assert_eq!(strip_line_breaks(b""), b"");
    }
}
