//! Command-line planner for Kremlin region profiles.
//!
//! Reads `sregions.txt` and `kremlin.bin` from a profile directory, plans for
//! the given target and prints the report to stdout.

use clap::{Parser, ValueEnum};
use hashbrown::HashSet;
use kremlin_planner::cost::{
    BandwidthModel, CacheAwareModel, CacheStatTable, CostModel, MemoryProfile, PlainModel, Target,
};
use kremlin_planner::forest::{NodeId, RegionForest};
use kremlin_planner::planner::{below_self_parallelism, non_doall_set, non_loop_set, DpPlanner};
use kremlin_planner::regions::{RegionFileFormat, StaticRegionTable};
use kremlin_planner::report::PlanReport;
use kremlin_planner::{trace, PlanResult};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelKind {
    Plain,
    BwBest,
    BwWorst,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExcludeKind {
    #[value(name = "none")]
    Nothing,
    NonLoop,
    NonDoall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatKind {
    Auto,
    Tab,
    Whitespace,
}

impl From<FormatKind> for RegionFileFormat {
    fn from(kind: FormatKind) -> Self {
        match kind {
            FormatKind::Auto => RegionFileFormat::Auto,
            FormatKind::Tab => RegionFileFormat::Tabbed,
            FormatKind::Whitespace => RegionFileFormat::Whitespace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "kremlin-plan", about = "Plan parallelization from a Kremlin profile")]
struct Args {
    /// Directory holding sregions.txt and kremlin.bin
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    #[arg(long, default_value_t = 4)]
    cores: u32,

    /// Cost of one parallel region instance, in work units
    #[arg(long, default_value_t = 0)]
    overhead: u32,

    #[arg(long, value_enum, default_value_t = ModelKind::Plain)]
    model: ModelKind,

    #[arg(long)]
    clock_mhz: Option<u32>,

    #[arg(long)]
    bandwidth_mb: Option<u32>,

    #[arg(long)]
    cache_mb: Option<u32>,

    /// Cache miss table, defaults to <dir>/cache.txt
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Per-node memory counters (uid reads writes loads stores)
    #[arg(long)]
    memory_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExcludeKind::NonDoall)]
    exclude: ExcludeKind,

    /// Also exclude regions below this self-parallelism
    #[arg(long)]
    min_self_parallelism: Option<f64>,

    /// Hide plan entries below this time reduction (percent)
    #[arg(long, default_value_t = 0.0)]
    min_time_reduction: f64,

    #[arg(long, value_enum, default_value_t = FormatKind::Auto)]
    region_format: FormatKind,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> PlanResult<()> {
    let table =
        StaticRegionTable::load_with_format(args.dir.join("sregions.txt"), args.region_format.into())?;
    let records = trace::decode(args.dir.join("kremlin.bin"))?;
    let forest = RegionForest::build(&table, records)?;

    let model = build_model(args)?;
    let exclude = exclusion_set(args, &forest);
    log::info!("Excluding {} of {} regions", exclude.len(), forest.len());

    let plan = DpPlanner::new(&forest, model.as_ref()).plan(&exclude)?;
    print!(
        "{}",
        PlanReport::new(&forest, &plan).with_min_reduction(args.min_time_reduction)
    );
    Ok(())
}

fn build_model(args: &Args) -> PlanResult<Box<dyn CostModel>> {
    let mut target = Target::new(args.cores, args.overhead);
    if let Some(mhz) = args.clock_mhz {
        target = target.with_clock_mhz(mhz);
    }
    if let Some(mb) = args.bandwidth_mb {
        target = target.with_bandwidth_mb_per_s(mb);
    }
    if let Some(mb) = args.cache_mb {
        target = target.with_cache_mb(mb);
    }

    let memory = match &args.memory_file {
        Some(path) => MemoryProfile::load(path)?,
        None => MemoryProfile::new(),
    };

    let model: Box<dyn CostModel> = match args.model {
        ModelKind::Plain => Box::new(PlainModel::new(target)),
        ModelKind::BwBest => Box::new(BandwidthModel::best(target, memory)),
        ModelKind::BwWorst => Box::new(BandwidthModel::worst(target, memory)),
        ModelKind::Cache => {
            let path = args
                .cache_file
                .clone()
                .unwrap_or_else(|| args.dir.join("cache.txt"));
            let table = CacheStatTable::load(path)?;
            Box::new(CacheAwareModel::new(target, table, memory)?)
        }
    };
    log::info!("Target: {} using the {} model", target, model.name());
    Ok(model)
}

fn exclusion_set(args: &Args, forest: &RegionForest) -> HashSet<NodeId> {
    let mut exclude = match args.exclude {
        ExcludeKind::Nothing => HashSet::new(),
        ExcludeKind::NonLoop => non_loop_set(forest),
        ExcludeKind::NonDoall => non_doall_set(forest),
    };
    if let Some(min) = args.min_self_parallelism {
        exclude.extend(below_self_parallelism(forest, min));
    }
    exclude
}
