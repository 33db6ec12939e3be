//! LIDC-IDRI 预处理工具: 生成共识结节汇总、U-Net 分割样本、YOLO 检测样本、调试可视化,
//! 以及训练/验证/测试集划分.

mod case;
mod config;
mod result;
mod runner;
mod split;
#[cfg(test)]
mod testing;

use anyhow::{ensure, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::PrepareConfig;
use log::LevelFilter;
use nodule_berry::cluster::ClusterConfig;
use nodule_berry::consts::{MASK_DISTANCE_THRESHOLD, VISUAL_DISTANCE_THRESHOLD};
use nodule_berry::export::{OutputLayout, SampleIndex, TargetKind};
use nodule_berry::BitDepth;
use result::RunReport;
use simple_logger::SimpleLogger;
use split::SplitRatio;
use std::path::PathBuf;
use utils::loader;

#[derive(Parser)]
#[command(name = "prepare")]
#[command(about = "LIDC-IDRI nodule consensus and training sample generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dataset root (defaults to $LIDC_IDRI_DIR, then ~/dataset/LIDC-IDRI)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output root (defaults to $LIDC_OUTPUT_DIR, then ~/dataset/lidc-out)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// More logging; repeat for trace output. RUST_LOG overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Options shared by every per-case command
#[derive(Args, Clone)]
struct CaseArgs {
    /// Merge distance threshold in pixels (default 10, or 30 for overlays)
    #[arg(long)]
    threshold: Option<f64>,

    /// Skip the first N cases (sorted by name)
    #[arg(long, default_value = "0")]
    skip: usize,

    /// Process cases in parallel
    #[arg(long)]
    parallel: bool,
}

/// Options shared by the sample export commands
#[derive(Args, Clone)]
struct ExportArgs {
    #[command(flatten)]
    cases: CaseArgs,

    /// Read nodule_summary_new.json when present instead of re-parsing the XML
    #[arg(long)]
    reuse_summary: bool,

    /// Image file extension
    #[arg(long, default_value = "jpg")]
    image_ext: String,

    /// Mask file extension (lossless formats only)
    #[arg(long, default_value = "png")]
    mask_ext: String,

    /// Image bit depth; 16-bit images span each slice's own HU range and need png or tif
    #[arg(long, value_enum, default_value = "8")]
    bit_depth: Depth,

    /// First sample index
    #[arg(long, default_value = "0")]
    start: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Depth {
    #[value(name = "8")]
    Eight,
    #[value(name = "16")]
    Sixteen,
}

impl From<Depth> for BitDepth {
    fn from(d: Depth) -> Self {
        match d {
            Depth::Eight => BitDepth::Eight,
            Depth::Sixteen => BitDepth::Sixteen,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum Target {
    Masks,
    Labels,
}

impl From<Target> for TargetKind {
    fn from(t: Target) -> Self {
        match t {
            Target::Masks => TargetKind::Mask,
            Target::Labels => TargetKind::Label,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and cluster annotations, writing nodule_summary_new.json into each case
    Summary {
        #[command(flatten)]
        args: CaseArgs,
    },
    /// Export images and segmentation masks
    Masks(ExportArgs),
    /// Export images and YOLO labels
    Labels(ExportArgs),
    /// Draw consensus nodules and reader contours onto their slices
    Overlay {
        #[command(flatten)]
        args: CaseArgs,
    },
    /// Split exported samples into train/val/test subsets
    Split {
        /// Exported sample directory (defaults to the output root)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Which kind of samples to split
        #[arg(long, value_enum, default_value = "labels")]
        target: Target,

        /// Shuffle seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Fraction of samples used for training
        #[arg(long, default_value = "0.8")]
        train: f64,

        /// Fraction of samples used for validation
        #[arg(long, default_value = "0.1")]
        val: f64,

        /// Image file extension
        #[arg(long, default_value = "jpg")]
        image_ext: String,

        /// Target file extension (defaults to png for masks, txt for labels)
        #[arg(long)]
        target_ext: Option<String>,
    },
}

impl CaseArgs {
    fn config(&self, default_threshold: f64) -> PrepareConfig {
        PrepareConfig {
            cluster: ClusterConfig::new(self.threshold.unwrap_or(default_threshold)),
            skip: self.skip,
            parallel: self.parallel,
            ..Default::default()
        }
    }
}

impl ExportArgs {
    fn config(&self) -> PrepareConfig {
        PrepareConfig {
            image_ext: self.image_ext.clone(),
            mask_ext: self.mask_ext.clone(),
            bit_depth: self.bit_depth.into(),
            reuse_summary: self.reuse_summary,
            ..self.cases.config(MASK_DISTANCE_THRESHOLD)
        }
    }
}

fn init_logger(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).env().init()?;
    Ok(())
}

fn dataset_root(cli: &Cli) -> anyhow::Result<PathBuf> {
    let root = cli
        .root
        .clone()
        .or_else(loader::dataset_dir_from_env_or_home)
        .context("cannot locate the dataset root, pass --root")?;
    ensure!(root.is_dir(), "{} is not a directory", root.display());
    Ok(root)
}

fn output_root(cli: &Cli) -> anyhow::Result<PathBuf> {
    cli.out
        .clone()
        .or_else(loader::output_dir_from_env_or_home)
        .context("cannot locate the output root, pass --out")
}

fn export(cli: &Cli, args: &ExportArgs, target: TargetKind) -> anyhow::Result<()> {
    let config = args.config();
    let cases = loader::cases(&dataset_root(cli)?, config.skip)?;
    let layout = config.layout(output_root(cli)?, target);
    println!("Exporting {} cases into {}...", cases.len(), layout.root().display());
    finish(runner::run_export(&cases, &layout, &config, SampleIndex::new(args.start))?)
}

/// 打印汇总. 所有病例都失败时返回错误.
fn finish(report: RunReport) -> anyhow::Result<()> {
    report.analyze();
    if let Some(next) = report.next() {
        log::info!("Pass --start {} to continue numbering", next.get());
    }
    ensure!(
        report.failed().is_empty() || !report.done().is_empty(),
        "all {} cases failed",
        report.failed().len()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    match &cli.command {
        Commands::Summary { args } => {
            let config = args.config(MASK_DISTANCE_THRESHOLD);
            let cases = loader::cases(&dataset_root(&cli)?, config.skip)?;
            finish(runner::run_summaries(&cases, &config))?;
        }
        Commands::Masks(args) => export(&cli, args, TargetKind::Mask)?,
        Commands::Labels(args) => export(&cli, args, TargetKind::Label)?,
        Commands::Overlay { args } => {
            let config = args.config(VISUAL_DISTANCE_THRESHOLD);
            let cases = loader::cases(&dataset_root(&cli)?, config.skip)?;
            let out = output_root(&cli)?.join("overlay");
            finish(runner::run_overlays(&cases, &out, &config))?;
        }
        Commands::Split {
            dir,
            target,
            seed,
            train,
            val,
            image_ext,
            target_ext,
        } => {
            let dir = match dir {
                Some(d) => d.clone(),
                None => output_root(&cli)?,
            };
            let ratio = SplitRatio::new(*train, *val).context("invalid split ratio")?;
            let kind = TargetKind::from(*target);
            let layout = OutputLayout::new(dir, kind)
                .with_image_ext(image_ext)
                .with_target_ext(target_ext.as_deref().unwrap_or(kind.default_ext()));
            let [n_train, n_val, n_test] = split::split_dataset(&layout, *seed, ratio)?;
            utils::sep();
            println!("train: {n_train}, val: {n_val}, test: {n_test}");
            utils::sep();
        }
    }
    Ok(())
}
