use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jstree::{Coverage, DeltaType, DeltaValue, JournaledStringTree, JstBuilder, TraversalConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jstree", about = "Delta-encoded sample collections and context traversal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug)]
struct Collection {
    /// Reference sequence (plain FASTA without headers or raw sequence file).
    reference: PathBuf,
    /// Delta table (`<position>\t<type>\t<value>\t<sample ids>` per line).
    deltas: PathBuf,
    /// Number of samples in the collection.
    #[arg(long)]
    dimension: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the explicit sequence of one sample.
    Materialize {
        #[command(flatten)]
        collection: Collection,
        /// Sample id to reconstruct.
        #[arg(long)]
        sample: usize,
    },
    /// Print every context window with the samples sharing it.
    Traverse {
        #[command(flatten)]
        collection: Collection,
        /// Symbols per context window.
        #[arg(long, default_value_t = 1)]
        context_size: usize,
        /// Branch lookahead (defaults to the context size).
        #[arg(long)]
        branch_length: Option<usize>,
        /// Stop after this many windows.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarize the delta table.
    Stats {
        #[command(flatten)]
        collection: Collection,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Materialize { collection, sample } => run_materialize(&collection, sample)?,
        Commands::Traverse {
            collection,
            context_size,
            branch_length,
            limit,
        } => run_traverse(&collection, context_size, branch_length, limit)?,
        Commands::Stats { collection } => run_stats(&collection)?,
    }

    Ok(())
}

fn run_materialize(collection: &Collection, sample: usize) -> Result<()> {
    let jst = load_collection(collection)?;
    let sequence = jst
        .materialize(sample)
        .with_context(|| format!("failed to materialize sample {sample}"))?;
    println!("{}", String::from_utf8_lossy(&sequence));
    Ok(())
}

fn run_traverse(
    collection: &Collection,
    context_size: usize,
    branch_length: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    let jst = load_collection(collection)?;
    let config = TraversalConfig::new(context_size)?
        .with_branch_length(branch_length.unwrap_or(context_size))?;
    let traverser = jst
        .traverser_with(config)
        .context("failed to initialize traverser")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for window in traverser.windows().take(limit.unwrap_or(usize::MAX)) {
        writeln!(
            out,
            "{}\t{}\t{}",
            String::from_utf8_lossy(&window.context),
            window.coverage.count(),
            window.coverage
        )?;
    }
    out.flush()?;
    Ok(())
}

fn run_stats(collection: &Collection) -> Result<()> {
    let jst = load_collection(collection)?;
    println!("reference\t{}", jst.reference().len());
    println!("dimension\t{}", jst.dimension());
    for delta_type in [DeltaType::Snp, DeltaType::Del, DeltaType::Ins, DeltaType::Sv] {
        println!("{delta_type}\t{}", jst.deltas().count(delta_type));
    }
    println!("fingerprint\t{}", jst.fingerprint());
    Ok(())
}

fn load_collection(collection: &Collection) -> Result<JournaledStringTree> {
    let reference = read_sequence_file(&collection.reference).with_context(|| {
        format!(
            "failed to read reference from {}",
            collection.reference.display()
        )
    })?;
    let mut builder = JstBuilder::new(reference, collection.dimension);

    let reader = BufReader::new(File::open(&collection.deltas).with_context(|| {
        format!("failed to open delta table {}", collection.deltas.display())
    })?);
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (position, value, ids) =
            parse_delta_line(line).with_context(|| format!("malformed delta on line {}", idx + 1))?;
        let coverage = Coverage::from_ids(collection.dimension, ids)
            .with_context(|| format!("bad coverage on line {}", idx + 1))?;
        builder
            .insert(position, value, coverage)
            .with_context(|| format!("rejected delta on line {}", idx + 1))?;
    }

    builder.freeze().context("inconsistent delta table")
}

fn parse_delta_line(line: &str) -> Result<(usize, DeltaValue, Vec<usize>)> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        bail!("expected 4 tab-separated fields, found {}", fields.len());
    }
    let position: usize = fields[0].parse().context("position")?;
    let raw = fields[2].trim();
    let value = match fields[1].trim().to_ascii_uppercase().as_str() {
        "SNP" => match raw.as_bytes() {
            [symbol] => DeltaValue::Snp(symbol.to_ascii_uppercase()),
            _ => bail!("SNP value must be one symbol, got {raw:?}"),
        },
        "DEL" => DeltaValue::Del(raw.parse().context("deletion length")?),
        "INS" => DeltaValue::Ins(raw.to_ascii_uppercase().into_bytes()),
        "SV" => {
            let (deleted, inserted) = raw
                .split_once(':')
                .context("SV value must be <length>:<sequence>")?;
            DeltaValue::Sv {
                deleted: deleted.parse().context("SV deletion length")?,
                inserted: inserted.to_ascii_uppercase().into_bytes(),
            }
        }
        other => bail!("unknown delta type {other:?}"),
    };
    let ids = fields[3]
        .split(',')
        .filter(|id| !id.trim().is_empty())
        .map(|id| id.trim().parse::<usize>().context("sample id"))
        .collect::<Result<Vec<_>>>()?;
    Ok((position, value, ids))
}

fn read_sequence_file(path: &Path) -> Result<Vec<u8>> {
    let contents = std::fs::read_to_string(path)?;
    let sequence: String = contents
        .lines()
        .filter(|line| !line.starts_with('>') && !line.trim().is_empty())
        .map(str::trim)
        .collect();
    Ok(sequence.to_ascii_uppercase().into_bytes())
}
