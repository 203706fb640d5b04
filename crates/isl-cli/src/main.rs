#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use isl_cpu::{RunConfig, RunExit, Simulator};
use isl_decoder::write_decode_record;
use isl_mem::{load_memory_file, MemoryImage};

#[derive(Debug, Parser)]
#[command(
    name = "isl",
    about = "Decode and execute an IA-32 subset program from a memory image file"
)]
struct Args {
    /// Memory image in `0xADDR: HH HH ...` text format.
    #[arg(env = "ISL_MEMORY_FILE")]
    memory_file: PathBuf,

    /// Where to write the per-instruction state trace.
    #[arg(long, env = "ISL_RESULTS", default_value = "results.txt")]
    results: PathBuf,

    /// Write the field-level report of every decoded instruction here.
    #[arg(long, env = "ISL_DECODE_DUMP")]
    decode_dump: Option<PathBuf>,

    /// Write the final memory contents here, one byte per line.
    #[arg(long, env = "ISL_MEM_DUMP")]
    mem_dump: Option<PathBuf>,

    /// Address the decode pass starts from (decimal or `0x` hex).
    #[arg(long, env = "ISL_START", default_value = "0", value_parser = parse_address)]
    start: u32,

    /// Stop after executing at most N instructions.
    #[arg(long, env = "ISL_MAX_STEPS")]
    max_steps: Option<u64>,

    /// Choose each next instruction by EIP so taken jumps change the path.
    ///
    /// Pair with `--max-steps` for programs that loop.
    #[arg(long, env = "ISL_FOLLOW_BRANCHES")]
    follow_branches: bool,
}

fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_decode_dump(path: &Path, sim: &Simulator) -> Result<()> {
    let mut out = create(path)?;
    for (i, inst) in sim.program().iter().enumerate() {
        write_decode_record(&mut out, i + 1, inst)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))
}

fn write_mem_dump(path: &Path, mem: &MemoryImage) -> Result<()> {
    let mut out = create(path)?;
    mem.write_dump(&mut out)
        .and_then(|()| out.flush())
        .with_context(|| format!("failed to write {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let memory = load_memory_file(&args.memory_file)
        .with_context(|| format!("failed to load {}", args.memory_file.display()))?;
    tracing::info!(
        path = %args.memory_file.display(),
        bytes = memory.len(),
        "memory image loaded"
    );

    let config = RunConfig {
        start_address: args.start,
        max_steps: args.max_steps,
        follow_branches: args.follow_branches,
    };
    let mut sim = Simulator::new(memory, config).context("decode pass failed")?;
    tracing::info!(count = sim.program().len(), "decode pass complete");

    if let Some(path) = &args.decode_dump {
        write_decode_dump(path, &sim)?;
    }

    let mut results = create(&args.results)?;
    let exit = sim
        .run(Some(&mut results))
        .with_context(|| format!("failed to write {}", args.results.display()))?;
    results
        .flush()
        .with_context(|| format!("failed to write {}", args.results.display()))?;

    if let Some(path) = &args.mem_dump {
        write_mem_dump(path, sim.memory())?;
    }

    match exit {
        RunExit::Halted { executed } => {
            tracing::info!(executed, eip = sim.state().eip, "halted");
        }
        RunExit::Completed { executed } => tracing::info!(executed, "program completed"),
        RunExit::StepLimit { executed } => {
            tracing::warn!(executed, "stopped at step limit");
        }
        RunExit::NoInstruction { eip, executed } => {
            tracing::warn!(executed, eip, "no decoded instruction at eip");
        }
    }
    println!(
        "Executed {} instruction(s); trace in {}",
        exit.executed(),
        args.results.display()
    );

    Ok(())
}
