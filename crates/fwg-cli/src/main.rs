use anyhow::Context;
use clap::{Parser, Subcommand};
use fwg_core::{GeneratorConfig, TableGenerator, TableKind, TableSelection, notation};
use fwg_export::{Converter, DEFAULT_OUTPUT};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fwgen")]
#[command(version, about = "Synthetic firewall rule-sets and export conversion", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate random chain sets in the internal notation
    Generate {
        /// Number of chain sets (files) to generate
        chain_sets: usize,
        /// Rules per chain
        rules: usize,
        /// YAML generator configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Root directory for generated files
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Table to generate, repeatable (default: filter)
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<TableKind>,
        /// Print the first chain set instead of writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Convert `iptables -S` exports (one file per table) into the internal notation
    Convert {
        /// Export files; the table is taken from each file name
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
        /// Compare with the existing output instead of writing it
        #[arg(long)]
        check: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            chain_sets,
            rules,
            config,
            seed,
            out_dir,
            tables,
            dry_run,
        } => {
            let mut config = match config {
                Some(path) => GeneratorConfig::from_file(&path)?,
                None => GeneratorConfig::default(),
            };
            if let Some(dir) = out_dir {
                config.output_root = dir;
            }
            if !tables.is_empty() {
                config.tables = tables.into_iter().map(TableSelection::new).collect();
            }
            if seed.is_some() {
                config.seed = seed;
            }
            handle_generate(&config, chain_sets, rules, dry_run)?;
        }
        Commands::Convert {
            inputs,
            output,
            check,
        } => handle_convert(&inputs, &output, check)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_generate(
    config: &GeneratorConfig,
    chain_sets: usize,
    rules: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    config.validate().context("Invalid generator configuration")?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, chain_sets, rules, "generating rule-sets");
    let mut rng = StdRng::seed_from_u64(seed);
    let generator = TableGenerator::new(config.composer()?);

    if dry_run {
        let ruleset = generator.generate_ruleset(&mut rng, &config.tables, rules)?;
        print!("{}", notation::render(&ruleset));
        return Ok(());
    }

    let written = generator.write_chain_sets(
        &mut rng,
        &config.tables,
        &config.output_root,
        chain_sets,
        rules,
    )?;

    println!(
        "✅ Wrote {} chain set(s) to {}",
        written.len(),
        config.output_root.join(rules.to_string()).display()
    );
    println!("   Seed: {}", seed);

    Ok(())
}

fn handle_convert(inputs: &[PathBuf], output: &Path, check: bool) -> anyhow::Result<()> {
    let converter = Converter::new();

    if check {
        let result = converter.check(inputs, output)?;
        let Some(diff) = result.diff() else {
            println!("✅ {} is up to date", result.output.display());
            return Ok(());
        };

        if result.existing.is_none() {
            println!("{} does not exist yet", result.output.display());
        }
        print!("{}", diff);
        anyhow::bail!("{} is out of date", result.output.display());
    }

    let ruleset = converter.convert_to_file(inputs, output)?;
    let rules: usize = ruleset.tables.iter().map(|t| t.rule_count()).sum();
    println!(
        "✅ Converted {} table(s), {} rule(s) into {}",
        ruleset.tables.len(),
        rules,
        output.display()
    );

    Ok(())
}
