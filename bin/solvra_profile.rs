//=====================================================
// File: bin/solvra_profile.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Command-line driver for the profiler
// Objective: Profile the demo module under a random workload, dump method
//            bodies before and after rewriting, and emit default settings
//=====================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use solvra_profiler::body::{DisabledFlag, MethodBody};
use solvra_profiler::collections::{CollectionReaders, FieldCount};
use solvra_profiler::demo::DemoModule;
use solvra_profiler::metrics::{MetricsStore, RecordRef};
use solvra_profiler::rewriter::{ProbeSite, rewrite};
use solvra_profiler::vm::{Runtime, Value};
use solvra_profiler::{EnableSummary, Profiler, ProfilerConfig, Report, Slot, logging};

#[derive(Parser)]
#[command(author, version, about = "SolvraProfiler method instrumentation driver", long_about = None)]
struct Cli {
    /// Profiler configuration file (TOML)
    #[arg(short, long, default_value = "profiler.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Instrument the demo module, drive it, and print the report
    Run {
        /// Number of randomly chosen entry-point calls
        #[arg(short, long, default_value_t = 1000)]
        iterations: u32,
        /// Seed for the workload generator
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Instrument even when `enable_profiling` is off in the config
        #[arg(long)]
        force: bool,
    },
    /// Print a demo method body before and after instrumentation
    Dump {
        /// Fully qualified method name, e.g. Game.Actors.Player.TakeDamage
        method: String,
    },
    /// Print the default configuration
    DefaultConfig,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    summary: EnableSummary,
    report: &'a Report,
    collections: Vec<FieldCount>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ProfilerConfig::load(&cli.config)?;
    logging::init("solvra_profile", config.debug);

    match cli.command {
        Command::Run {
            iterations,
            seed,
            json,
            force,
        } => run(&config, iterations, seed, json, force),
        Command::Dump { method } => dump(&method),
        Command::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&ProfilerConfig::default())?);
            Ok(())
        }
    }
}

fn run(config: &ProfilerConfig, iterations: u32, seed: u64, json: bool, force: bool) -> Result<()> {
    if !config.enabled {
        println!("profiler disabled by configuration");
        return Ok(());
    }

    let demo = DemoModule::build();
    let runtime = Runtime::new(demo.domain.clone());
    demo.populate(&runtime, 12)?;

    let profiler = Profiler::from_config(config, &demo.domain)?;
    let summary = if config.enable_profiling || force {
        profiler.enable(&demo.domain, &runtime)
    } else {
        EnableSummary::default()
    };

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..iterations {
        let entry = demo.entry_points[rng.gen_range(0..demo.entry_points.len())];
        let args: Vec<Value> = (0..entry.parameters)
            .map(|_| Value::Int(rng.gen_range(0..100)))
            .collect();
        runtime
            .invoke(entry.method, &args)
            .with_context(|| format!("calling {:?}", demo.domain.method(entry.method)))?;
    }

    let collections = CollectionReaders::new();
    collections.scan(&demo.domain, demo.module);
    let counts = collections.counts(&runtime);

    let report = profiler.report(false);
    if json {
        let output = RunOutput {
            summary,
            report: &report,
            collections: counts,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "instrumented {} of {} candidates ({} pass-through, {} failed)\n",
            summary.instrumented, summary.candidates, summary.pass_through, summary.failed
        );
        print!("{}", report.render());
        println!("\nCollections:");
        for count in counts {
            println!("{} - {}", count.field, count.count);
        }
    }
    Ok(())
}

fn dump(name: &str) -> Result<()> {
    let demo = DemoModule::build();
    let method = demo
        .domain
        .methods()
        .find(|method| demo.domain.method(*method).display_name() == name)
        .ok_or_else(|| anyhow!("no method named {name}"))?;
    let body = demo
        .domain
        .method(method)
        .body()
        .ok_or_else(|| anyhow!("{name} has no body"))?;

    let store = Arc::new(MetricsStore::with_capacity(1));
    let record = RecordRef::new(store, Slot::new(0))
        .ok_or_else(|| anyhow!("empty metrics store"))?;
    let probe = ProbeSite::new(record, DisabledFlag::new());
    let outcome = rewrite(body, &probe);
    let instrumented = outcome.is_instrumented();
    let rewritten = outcome.into_body();

    println!("original {name} (locals {})", body.locals);
    print_body(body);
    println!(
        "\n{} {name} (locals {})",
        if instrumented { "instrumented" } else { "unchanged" },
        rewritten.locals
    );
    print_body(&rewritten);
    Ok(())
}

fn print_body(body: &MethodBody) {
    for block in &body.blocks {
        println!("  L{}:", block.label.0);
        for instruction in &block.instructions {
            match instruction.debug {
                Some(line) => println!("    {:?}  ; line {line}", instruction.opcode),
                None => println!("    {:?}", instruction.opcode),
            }
        }
    }
}

//=====================================================
// End of file
//=====================================================
