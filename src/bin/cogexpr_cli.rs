use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

use cogexpr::config::{PipelineConfig, Variant};
use cogexpr::run_pipeline;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Per-genome mapped reads per sample, RPKM averaged over samples
    Averaged,
    /// One filtered count table and a single mapped-read total
    Pooled,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Averaged => Variant::Averaged,
            VariantArg::Pooled => Variant::Pooled,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cogexpr")]
#[command(version)]
#[command(about = "RPKM-normalized expression and majority annotation per (clade, COG)")]
struct Cli {
    /// Project root holding data/ and results/
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Where the mapped-read denominator comes from
    #[arg(short = 'm', long, value_enum, default_value = "pooled")]
    variant: VariantArg,

    /// Override the taxonomy table
    #[arg(long)]
    taxonomy: Option<PathBuf>,

    /// Override the (clade, COG) -> CDS table
    #[arg(long)]
    membership: Option<PathBuf>,

    /// Override the COG x genome annotation table
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append the within-clade percentile rank of each COG
    #[arg(long)]
    percentile: bool,

    /// Worker threads (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig::with_root(&self.root);
        cfg.variant = self.variant.into();
        cfg.percentile = self.percentile;
        cfg.threads = self.threads;
        if let Some(p) = self.taxonomy {
            cfg.taxonomy = p;
        }
        if let Some(p) = self.membership {
            cfg.membership = p;
        }
        if let Some(p) = self.annotations {
            cfg.annotations = p;
        }
        if let Some(p) = self.output {
            cfg.output_dir = p;
        }
        cfg
    }
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let cfg = cli.into_config();

    if cfg.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.threads)
            .build_global()
        {
            log::warn!("Could not size the thread pool: {e}");
        }
    }

    let progress = spinner("green", "Normalizing expression...");
    let results = match run_pipeline(&cfg) {
        Ok(r) => r,
        Err(e) => {
            progress.abandon_with_message("Normalization failed.");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    progress.finish_with_message(format!(
        "Wrote {} COGs for {} clades ({} variant) to {}",
        results.total_rows(),
        results.clade_tables.len(),
        results.variant,
        cfg.output_dir.display()
    ));

    ExitCode::SUCCESS
}
