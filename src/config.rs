/*!
 * Configuration handling for dirsnap
 */

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::error::Result;
use crate::rules::RuleSet;
use crate::types::{Attribute, HashMode};

/// Global check policy, fixed for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotConfiguration {
    check_size: bool,
    check_modification_time: bool,
    check_md5: bool,
    check_permissions: bool,
    hash_mode: HashMode,
}

impl Default for SnapshotConfiguration {
    fn default() -> Self {
        Self {
            check_size: true,
            check_modification_time: true,
            check_md5: true,
            check_permissions: true,
            hash_mode: HashMode::Binary,
        }
    }
}

impl SnapshotConfiguration {
    /// Enable or disable the global check for one attribute
    pub fn with_check(mut self, attribute: Attribute, enabled: bool) -> Self {
        match attribute {
            Attribute::Size => self.check_size = enabled,
            Attribute::ModificationTime => self.check_modification_time = enabled,
            Attribute::Md5 => self.check_md5 = enabled,
            Attribute::Permissions => self.check_permissions = enabled,
        }
        self
    }

    pub fn with_hash_mode(mut self, hash_mode: HashMode) -> Self {
        self.hash_mode = hash_mode;
        self
    }

    /// Whether the attribute is globally enabled
    pub fn is_enabled(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Size => self.check_size,
            Attribute::ModificationTime => self.check_modification_time,
            Attribute::Md5 => self.check_md5,
            Attribute::Permissions => self.check_permissions,
        }
    }

    pub fn hash_mode(&self) -> HashMode {
        self.hash_mode
    }
}

/// What a directory scan does when one file cannot be captured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Stop the scan and return the first failure (default)
    #[default]
    Abort,
    /// Leave the file out and record the failure in the scan statistics
    Skip,
}

/// Flags shared by every command that captures files
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Do not capture file sizes
    #[clap(long)]
    pub no_size: bool,

    /// Do not capture modification times
    #[clap(long)]
    pub no_mtime: bool,

    /// Do not hash file contents
    #[clap(long)]
    pub no_md5: bool,

    /// Do not capture permissions
    #[clap(long)]
    pub no_permissions: bool,

    /// How file contents are read before hashing
    #[clap(long, value_enum, default_value_t = HashMode::Binary)]
    pub hash_mode: HashMode,

    /// Per-path rule, e.g. '*.log=-md5,-size' or 'conf/**=+md5' (repeatable)
    #[clap(long = "rule", value_name = "PATTERN=SPEC")]
    pub rules: Vec<String>,

    /// Comma-separated list of file name patterns to ignore
    #[clap(long, value_delimiter = ',')]
    pub ignore_patterns: Vec<String>,

    /// Comma-separated list of file name patterns to include (if specified, only matching files are captured)
    #[clap(long, value_delimiter = ',')]
    pub include_patterns: Vec<String>,

    /// Respect .gitignore files
    #[clap(long)]
    pub respect_gitignore: bool,

    /// Number of threads to use for capturing
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// What to do when a single file cannot be captured
    #[clap(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_error: FailurePolicy,
}

/// Command-line arguments for dirsnap
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "dirsnap",
    version = env!("CARGO_PKG_VERSION"),
    about = "Capture, persist and compare file attribute snapshots",
    long_about = "Records size, modification time, MD5 checksum and permissions for every file under a directory, saves the capture as XML and reports which files differ between two captures or between a capture and the live tree."
)]
pub struct Args {
    /// Enable debug logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture a directory and save the snapshot
    Take {
        /// Directory to capture
        #[clap(default_value = ".")]
        directory: PathBuf,

        /// Output XML file
        #[clap(short, long, default_value = ".dirsnap.xml")]
        output: PathBuf,

        /// Snapshot label (defaults to the directory name)
        #[clap(long)]
        name: Option<String>,

        #[clap(flatten)]
        checks: CheckArgs,
    },

    /// Compare two snapshots; each side is a saved snapshot file or a live directory
    Compare {
        left: PathBuf,
        right: PathBuf,

        /// Report format
        #[clap(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        #[clap(flatten)]
        checks: CheckArgs,
    },

    /// Generate shell completions
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

/// Report formats selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Settings for one directory scan
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Directory to capture
    pub target_dir: PathBuf,

    /// Snapshot file being written, never captured itself
    pub output_file: Option<PathBuf>,

    /// Global check policy
    pub snapshot: SnapshotConfiguration,

    /// Per-path overrides
    pub rules: RuleSet,

    /// Patterns to ignore
    pub ignore_patterns: Vec<String>,

    /// Patterns to include (if empty, include all)
    pub include_patterns: Vec<String>,

    /// Whether to respect .gitignore files
    pub respect_gitignore: bool,

    /// Number of threads to use for capturing
    pub num_threads: usize,

    /// What to do with files that cannot be captured
    pub failure_policy: FailurePolicy,
}

impl ScanConfig {
    /// Scan of `target_dir` with the default policy and no rules
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            output_file: None,
            snapshot: SnapshotConfiguration::default(),
            rules: RuleSet::new(),
            ignore_patterns: Vec::new(),
            include_patterns: Vec::new(),
            respect_gitignore: false,
            num_threads: 4,
            failure_policy: FailurePolicy::Abort,
        }
    }

    /// Create configuration from command-line arguments
    pub fn from_args(target_dir: PathBuf, args: &CheckArgs) -> Result<Self> {
        let snapshot = SnapshotConfiguration::default()
            .with_check(Attribute::Size, !args.no_size)
            .with_check(Attribute::ModificationTime, !args.no_mtime)
            .with_check(Attribute::Md5, !args.no_md5)
            .with_check(Attribute::Permissions, !args.no_permissions)
            .with_hash_mode(args.hash_mode);

        let mut rules = RuleSet::new();
        for text in &args.rules {
            rules.extend(text.parse::<RuleSet>()?);
        }

        Ok(Self {
            target_dir,
            output_file: None,
            snapshot,
            rules,
            ignore_patterns: args.ignore_patterns.clone(),
            include_patterns: args.include_patterns.clone(),
            respect_gitignore: args.respect_gitignore,
            num_threads: args.threads,
            failure_policy: args.on_error,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        crate::ensure!(
            self.target_dir.is_dir(),
            Config,
            "Target directory not found: {}",
            self.target_dir.display()
        );
        crate::ensure!(self.num_threads > 0, Config, "Thread count must be at least 1");
        Ok(())
    }
}
