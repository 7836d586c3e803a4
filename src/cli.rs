use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CliSubcommand {
    /// Build a fuzzy search index from graph sequences
    Build(BuildArgs),

    /// Align query sequences against a stored index
    Align(AlignArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// FASTA file (optionally gzipped) with the sequences forming the graph
    pub sequences: PathBuf,

    /// Output index filename
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of context characters indexed on each side of a node
    #[arg(long, default_value_t = 6)]
    pub context_length: usize,

    /// Keep candidates scoring within this margin of the per-position best
    #[arg(long, default_value_t = 2)]
    pub error_margin: i32,

    /// Lookback window and graph-distance cap of the path finder
    #[arg(long, default_value_t = 10)]
    pub max_distance: usize,

    /// Score for matching characters
    #[arg(long, default_value_t = 1)]
    pub match_score: i32,

    /// Score for mismatching characters
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub mismatch_score: i32,

    /// Penalty for opening a gap
    #[arg(long, default_value_t = 2)]
    pub gap_open: i32,

    /// Penalty for extending an open gap
    #[arg(long, default_value_t = 1)]
    pub gap_extend: i32,

    /// Disable the path-finder heuristics (slower, confidence-checked)
    #[arg(long)]
    pub no_heuristics: bool,

    /// Run the left and right context searches of a position in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Index file produced by `build`
    pub index: PathBuf,

    /// FASTA file (optionally gzipped) with the query sequences
    pub queries: PathBuf,

    /// Use the exact partial-order aligner instead of the fuzzy index
    #[arg(long)]
    pub exact: bool,
}
