use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "strata workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the allocator benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const BENCH: &str = "alloc_benchmark";

/// Function id every workload is compared against.
const BASELINE: &str = "Box::new";

/// group -> function -> mean nanoseconds per iteration
type Results = BTreeMap<String, BTreeMap<String, f64>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!(">>> Running {BENCH}...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.env("CARGO_INCREMENTAL", "0")
        .env("RUSTFLAGS", "-C opt-level=3 -C codegen-units=1")
        .args(["bench", "--bench", BENCH]);

    // Args for the test runner (Criterion) go after --
    cmd.arg("--");
    if quick {
        cmd.args(["--measurement-time", "0.1", "--sample-size", "10", "--noplot"]);
    }

    let status = cmd
        .status()
        .with_context(|| format!("failed to launch cargo bench for {BENCH}"))?;
    if !status.success() {
        anyhow::bail!("benchmark {BENCH} failed");
    }

    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("failed to create {}", report_path.display()))?;

    writeln!(file, "# Region Allocator Benchmark Report")?;

    for (group, functions) in &results {
        writeln!(file, "\n## {group}\n")?;
        writeln!(file, "| Allocator | Mean time | vs {BASELINE} |")?;
        writeln!(file, "|---|---|---|")?;

        let baseline = functions.get(BASELINE).copied();
        for (function, &mean_ns) in functions {
            let rel = match baseline {
                Some(base) if mean_ns > 0.0 => format!("**{:.2}x**", base / mean_ns),
                _ => "-".to_string(),
            };
            writeln!(file, "| {function} | {} | {rel} |", format_time(mean_ns))?;
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_time(ns: f64) -> String {
    if ns > 1_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if ns > 1_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else {
        format!("{ns:.0} ns")
    }
}

fn collect_results(dir: &Path, results: &mut Results) -> Result<()> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }

        // Structure: <group>/<function>/new/{benchmark,estimates}.json
        let Some(run_dir) = path.parent() else { continue };
        if run_dir.file_name().and_then(|s| s.to_str()) != Some("new") {
            continue;
        }

        let meta = read_json(&run_dir.join("benchmark.json"))?;
        let (Some(group), Some(function)) = (
            meta.get("group_id").and_then(|v| v.as_str()),
            meta.get("function_id").and_then(|v| v.as_str()),
        ) else {
            continue;
        };

        let estimates = read_json(&path)?;
        if let Some(mean_ns) = estimates
            .get("mean")
            .and_then(|m| m.get("point_estimate"))
            .and_then(|v| v.as_f64())
        {
            results
                .entry(group.to_string())
                .or_default()
                .insert(function.to_string(), mean_ns);
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
