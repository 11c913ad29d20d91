//! Coarsening and lock-contention driver for the hierarchical graph store.
//!
//! Run with for example:
//!
//! ```bash
//! # Defaults: 10k nodes, 40k edges, 4 coarsening levels
//! cargo run --release --bin hgraph-bench
//!
//! # Larger graph, JSON report, lock hammering from 8 threads
//! HGRAPH_NODES=100000 RUST_LOG=hgraph=debug \
//!   cargo run --release --bin hgraph-bench -- --threads 8 --format json
//! ```
#![forbid(unsafe_code)]

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hgraph::{
    CoarseningStrategy, GraphOptions, GraphStats, HierarchicalGraph, LockOptions, LockRegistry,
    MaxMatchingCoarsening, NodeId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hgraph-bench",
    version,
    about = "Coarsen a random graph and report hierarchy statistics"
)]
struct Cli {
    #[arg(long, env = "HGRAPH_SEED", default_value_t = 42, help = "RNG seed")]
    seed: u64,

    #[arg(long, env = "HGRAPH_NODES", default_value_t = 10_000, help = "Leaf nodes to create")]
    nodes: usize,

    #[arg(long, env = "HGRAPH_EDGES", default_value_t = 40_000, help = "Edges to create")]
    edges: usize,

    #[arg(long, env = "HGRAPH_LEVELS", default_value_t = 4, help = "Coarsening levels to build")]
    levels: usize,

    #[arg(
        long,
        env = "HGRAPH_DIVISOR",
        default_value_t = 2.0,
        help = "Divisor applied to non-deep edges"
    )]
    divisor: f64,

    #[arg(
        long,
        env = "HGRAPH_THREADS",
        default_value_t = 0,
        help = "Threads hammering the lock registry (0 disables)"
    )]
    threads: usize,

    #[arg(
        long,
        env = "HGRAPH_LOCK_ROUNDS",
        default_value_t = 100_000,
        help = "Lock/unlock cycles per hammering thread"
    )]
    lock_rounds: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help = "Report format")]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct LevelReport {
    level: usize,
    groups: usize,
    stats: GraphStats,
    elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
struct LockReport {
    threads: usize,
    rounds: usize,
    elapsed_ms: f64,
    ops_per_sec: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    build_ms: f64,
    initial: GraphStats,
    coarsening: Vec<LevelReport>,
    refined: GraphStats,
    refine_ms: f64,
    locks: Option<LockReport>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("hgraph-bench error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hgraph=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    info!(?cli, "starting");
    let graph = HierarchicalGraph::open(GraphOptions::new().non_deep_divisor(cli.divisor))?;

    let start = Instant::now();
    build_random_graph(&graph, &cli)?;
    let build_ms = millis(start.elapsed());
    let initial = graph.stats();

    let strategy = MaxMatchingCoarsening;
    let mut coarsening = Vec::with_capacity(cli.levels);
    for level in 1..=cli.levels {
        let start = Instant::now();
        let groups = strategy.coarsen(&graph)?;
        let elapsed_ms = millis(start.elapsed());
        if groups == 0 {
            break;
        }
        coarsening.push(LevelReport {
            level,
            groups,
            stats: graph.stats(),
            elapsed_ms,
        });
    }
    graph.verify()?;

    let start = Instant::now();
    while strategy.refine(&graph)? > 0 {}
    let refine_ms = millis(start.elapsed());
    graph.verify()?;

    let locks = (cli.threads > 0).then(|| hammer_locks(cli.threads, cli.lock_rounds));
    let report = Report {
        seed: cli.seed,
        build_ms,
        initial,
        coarsening,
        refined: graph.stats(),
        refine_ms,
        locks,
    };
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn build_random_graph(graph: &HierarchicalGraph, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let nodes: Vec<NodeId> = (0..cli.nodes).map(|_| graph.add_node()).collect();
    if nodes.len() < 2 {
        return Ok(());
    }
    for _ in 0..cli.edges {
        let source = nodes[rng.gen_range(0..nodes.len())];
        let target = nodes[rng.gen_range(0..nodes.len())];
        if source != target {
            graph.add_edge(source, target, rng.gen_range(0.5..2.0))?;
        }
    }
    Ok(())
}

/// Cycles identifiers 1..=16 through a fresh registry from `threads` threads.
fn hammer_locks(threads: usize, rounds: usize) -> LockReport {
    let registry = Arc::new(LockRegistry::new(&LockOptions::default()));
    let start = Instant::now();
    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(t as u64);
                for _ in 0..rounds {
                    let id = rng.gen_range(1..=16u64);
                    let _guard = registry.guard(id);
                }
            })
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }
    let elapsed = start.elapsed();
    let total = (threads * rounds) as f64;
    LockReport {
        threads,
        rounds,
        elapsed_ms: millis(elapsed),
        ops_per_sec: total / elapsed.as_secs_f64().max(f64::EPSILON),
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1_000.0
}

fn print_stats(label: &str, stats: &GraphStats) {
    println!(
        "{label:<10} nodes={} groups={} visible={} edges={} meta_edges={} max_level={}",
        stats.nodes,
        stats.groups,
        stats.visible_nodes,
        stats.edges,
        stats.meta_edges,
        stats.max_level
    );
}

fn print_text(report: &Report) {
    println!("seed {} built in {:.2} ms", report.seed, report.build_ms);
    print_stats("initial", &report.initial);
    for level in &report.coarsening {
        print_stats(&format!("level {}", level.level), &level.stats);
        println!(
            "           {} groups in {:.2} ms",
            level.groups, level.elapsed_ms
        );
    }
    print_stats("refined", &report.refined);
    println!("refined in {:.2} ms", report.refine_ms);
    if let Some(locks) = &report.locks {
        println!(
            "locks: {} threads x {} rounds in {:.2} ms ({:.0} ops/s)",
            locks.threads, locks.rounds, locks.elapsed_ms, locks.ops_per_sec
        );
    }
}
