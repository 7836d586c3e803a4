use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use flate2::read::MultiGzDecoder;
use itertools::Itertools;
use noodles::fasta;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fuzzaln::aligner;
use fuzzaln::config::Config;
use fuzzaln::graph::SequenceGraph;
use fuzzaln::index::FuzzySearchIndex;
use fuzzaln::io::index::{load_index, save_index};

mod cli;

use cli::{AlignArgs, BuildArgs, CliArgs, CliSubcommand};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = CliArgs::parse();
    match args.command {
        CliSubcommand::Build(v) => build_subcommand(&v),
        CliSubcommand::Align(v) => align_subcommand(&v),
    }
}

fn read_fasta(path: &Path) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let is_gzipped = path
        .file_name()
        .map(|v| v.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);

    let reader_inner: Box<dyn io::BufRead> = if is_gzipped {
        Box::new(File::open(path).map(MultiGzDecoder::new).map(BufReader::new)?)
    } else {
        Box::new(File::open(path).map(BufReader::new)?)
    };
    let mut reader = fasta::io::Reader::new(reader_inner);

    let mut sequences = Vec::new();
    for result in reader.records() {
        let record = result?;
        let name = std::str::from_utf8(record.name())
            .context("sequence name is not valid UTF-8")?
            .to_string();
        sequences.push((name, record.sequence().as_ref().to_vec()));
    }

    Ok(sequences)
}

fn build_subcommand(build_args: &BuildArgs) -> anyhow::Result<()> {
    let config = Config {
        match_score: build_args.match_score,
        mismatch_score: build_args.mismatch_score,
        gap_open: build_args.gap_open,
        gap_extend: build_args.gap_extend,
        error_margin: build_args.error_margin,
        context_length: build_args.context_length,
        max_distance: build_args.max_distance,
        heuristics: !build_args.no_heuristics,
        parallel: build_args.parallel,
    };

    let mut graph = SequenceGraph::new();
    for (name, seq) in read_fasta(&build_args.sequences)? {
        info!("Adding {} ({} characters) to the graph", name, seq.len());
        graph.add_sequence(&seq);
    }

    let index = FuzzySearchIndex::build(graph, config);
    save_index(&index, &build_args.output)?;

    Ok(())
}

fn align_subcommand(align_args: &AlignArgs) -> anyhow::Result<()> {
    let index = load_index(&align_args.index)?;

    for (name, seq) in read_fasta(&align_args.queries)? {
        let alignment = if align_args.exact {
            aligner::align(index.graph(), &seq, index.config())?
        } else {
            index.align(&seq)
        };

        info!("{name}: {alignment}");
        println!(
            "{name}\t{}\t{}",
            alignment.score,
            alignment.positions.iter().map(|p| p.to_string()).join(",")
        );
    }

    Ok(())
}
