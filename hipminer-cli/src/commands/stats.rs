use std::path::PathBuf;

use clap::Args;

use hipminer_core::extract::stats::param_stats;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Node type to aggregate (e.g. "pyrosolver::2.0")
    pub node_type: String,

    /// Restrict to a single parameter
    #[arg(long)]
    pub param: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Database path (default: next to the cache directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub async fn run(args: StatsArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let db_path = super::resolve_db_path(&config, args.db.as_deref());
    let store = super::open_store(&db_path)?;

    let stats = param_stats(&store, &args.node_type, args.param.as_deref()).await?;

    if stats.is_empty() {
        println!("No numeric samples for {} yet.", args.node_type);
        return Ok(());
    }

    println!("Parameter usage for {}", args.node_type);
    println!();
    println!(
        "  {:<24} {:>7} {:>10} {:>10} {:>10} {:>8}  usage range",
        "parameter", "samples", "min", "max", "mean", "modified"
    );
    for s in &stats {
        println!(
            "  {:<24} {:>7} {:>10.4} {:>10.4} {:>10.4} {:>8}  [{:.4}, {:.4}]",
            s.param_name,
            s.sample_count,
            s.min,
            s.max,
            s.mean,
            s.modified_count,
            s.usage_range.0,
            s.usage_range.1,
        );
    }

    Ok(())
}
