use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::errors::AppError;
use crate::model::{DirectoryPolicy, ScanOptions};

#[derive(Debug, Parser)]
#[command(name = "bigfind")]
#[command(about = "Find large and stale files to reclaim disk space")]
pub struct Cli {
    /// Root path to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Smallest file size to report, e.g. 500K, 10M, 1.5G (1024-based)
    #[arg(short = 's', long, default_value = "0", value_parser = parse_size)]
    pub min_size: u64,

    /// Number of scan workers (defaults to available cores minus one)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Which subdirectories become stealable work items
    #[arg(long, value_enum, default_value_t = PolicyArg::Split)]
    pub directory_policy: PolicyArg,

    /// Maximum number of rows to print
    #[arg(short = 'n', long, default_value_t = 50)]
    pub limit: usize,

    /// Only show files not accessed for at least this many days
    #[arg(long)]
    pub older_than: Option<u64>,

    /// Stop the scan after this many seconds
    #[arg(long)]
    pub max_duration: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Every subdirectory can be stolen by another worker
    Split,
    /// Only directories whose own inode size reaches --min-size are shared
    OwnSize,
}

impl PolicyArg {
    pub fn into_policy(self) -> DirectoryPolicy {
        match self {
            Self::Split => DirectoryPolicy::Split,
            Self::OwnSize => DirectoryPolicy::OwnSize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub scan_options: ScanOptions,
    pub limit: usize,
    pub older_than_days: Option<u64>,
    pub max_duration: Option<Duration>,
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let root = std::fs::canonicalize(&cli.path).map_err(|error| AppError::InaccessibleRoot {
            path: cli.path.clone(),
            reason: error.to_string(),
        })?;
        Ok(Self {
            scan_options: ScanOptions {
                root,
                min_size: cli.min_size,
                workers: cli.threads.filter(|count| *count > 0),
                directory_policy: cli.directory_policy.into_policy(),
            },
            limit: cli.limit,
            older_than_days: cli.older_than,
            max_duration: cli.max_duration.map(Duration::from_secs),
            verbose: cli.verbose,
        })
    }
}

/// Parses a byte count with an optional `K`, `M`, `G` or `T` suffix (1024-based).
pub fn parse_size(input: &str) -> Result<u64, AppError> {
    let invalid = |reason: &str| AppError::InvalidSize {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();
    let digits = upper.strip_suffix('B').unwrap_or(&upper);
    let (number, multiplier) = match digits.chars().last() {
        Some('K') => (&digits[..digits.len() - 1], 1_u64 << 10),
        Some('M') => (&digits[..digits.len() - 1], 1 << 20),
        Some('G') => (&digits[..digits.len() - 1], 1 << 30),
        Some('T') => (&digits[..digits.len() - 1], 1 << 40),
        Some(_) => (digits, 1),
        None => return Err(invalid("empty size")),
    };
    let number = number.trim();

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("size overflows 64 bits"));
    }

    let value: f64 = number.parse().map_err(|_| invalid("not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid("size must be a non-negative number"));
    }
    let bytes = value * multiplier as f64;
    if bytes > u64::MAX as f64 {
        return Err(invalid("size overflows 64 bits"));
    }
    Ok(bytes as u64)
}
