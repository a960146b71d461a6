use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use memcg_cli::units::{format_bytes, parse_size};
use memcg_cli::{init_logging, Config};
use memcg_core::{
    FsBackend, GroupDescriptor, LifecycleManager, MemoryData, MemoryReport, Pid, ResourceSpec,
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// memcg - cgroup memory controller adapter
///
/// Applies memory limits to a control group on either cgroup hierarchy
#[derive(Parser, Debug)]
#[command(name = "memcg")]
#[command(version = VERSION)]
#[command(about = "Apply, inspect and remove cgroup memory limits", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/memcg/config.toml")]
    config: PathBuf,

    /// Override the cgroup mount root
    #[arg(long, env = "MEMCG_MOUNT_ROOT")]
    mount_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the group, write limits and move a process into it
    Apply {
        /// Group identifier relative to the controller root
        #[arg(short, long)]
        group: String,

        /// Process to move into the group
        #[arg(short, long)]
        pid: i32,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Rewrite the limits of an existing group
    Update {
        #[arg(short, long)]
        group: String,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Remove the group directory
    Remove {
        #[arg(short, long)]
        group: String,
    },

    /// Show memory statistics of a group
    Stats {
        #[arg(short, long)]
        group: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Limit flags overriding the `[memory]` section of the config
#[derive(Args, Debug, Default)]
struct LimitArgs {
    /// Hard memory limit (e.g. 512MiB)
    #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
    memory: Option<i64>,

    /// Soft memory limit
    #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
    reservation: Option<i64>,

    /// Memory plus swap limit
    #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
    swap: Option<i64>,

    /// Kernel memory limit (v1 only)
    #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
    kernel_memory: Option<i64>,

    /// Disable the OOM killer (v1 only)
    #[arg(long)]
    oom_kill_disable: bool,

    /// Swappiness 0-100, -1 leaves it unset (v1 only)
    #[arg(long, allow_hyphen_values = true)]
    swappiness: Option<i64>,
}

impl LimitArgs {
    fn merge_into(&self, mut spec: ResourceSpec) -> ResourceSpec {
        if let Some(memory) = self.memory {
            spec.memory = memory;
        }
        if let Some(reservation) = self.reservation {
            spec.memory_reservation = reservation;
        }
        if let Some(swap) = self.swap {
            spec.memory_swap = swap;
        }
        if let Some(kernel_memory) = self.kernel_memory {
            spec.kernel_memory = kernel_memory;
        }
        if self.oom_kill_disable {
            spec.oom_kill_disable = true;
        }
        if let Some(swappiness) = self.swappiness {
            spec.memory_swappiness = swappiness;
        }
        spec
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig { output } = &cli.command {
        return generate_config(output);
    }

    let config_found = cli.config.exists();
    let mut config = load_config(&cli.config)?;
    if let Some(root) = &cli.mount_root {
        config.cgroup.mount_root = root.clone();
    }

    // Logging settings come from the config, so it is loaded first
    let _guard = init_logging(&config, cli.verbose)?;
    info!("memcg v{} starting", VERSION);
    if !config_found {
        warn!("Configuration file not found: {:?}, using defaults", cli.config);
    }

    match cli.command {
        Commands::Apply { group, pid, limits } => {
            let spec = resolve_spec(&config, &limits)?;
            run_apply(&config, group, Pid::from_raw(pid), spec)
        }
        Commands::Update { group, limits } => {
            let spec = resolve_spec(&config, &limits)?;
            run_update(&config, group, spec)
        }
        Commands::Remove { group } => run_remove(&config, &group),
        Commands::Stats { group, json } => run_stats(&config, &group, json),
        Commands::GenerateConfig { .. } => Ok(()),
    }
}

fn manager(config: &Config) -> LifecycleManager<FsBackend> {
    LifecycleManager::new(FsBackend::new(&config.cgroup.mount_root))
}

/// Merge flags over the configured limits and validate the result
fn resolve_spec(config: &Config, limits: &LimitArgs) -> Result<ResourceSpec> {
    let mut merged = config.clone();
    merged.memory = limits.merge_into(config.memory.clone());
    merged
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid memory limits: {}", e))?;
    Ok(merged.memory)
}

fn run_apply(config: &Config, group: String, pid: Pid, spec: ResourceSpec) -> Result<()> {
    let desc = GroupDescriptor::new(group, pid, spec);
    manager(config)
        .apply(&desc)
        .with_context(|| format!("Failed to apply memory limits to {}", desc.group))?;

    println!(
        "{}",
        format!("✅ Applied memory limits to {} (pid {})", desc.group, pid).green()
    );
    Ok(())
}

fn run_update(config: &Config, group: String, spec: ResourceSpec) -> Result<()> {
    // Membership is untouched by an update
    let desc = GroupDescriptor::new(group, Pid::this(), spec);
    manager(config)
        .update(&desc)
        .with_context(|| format!("Failed to update memory limits of {}", desc.group))?;

    println!("{}", format!("✅ Updated {}", desc.group).green());
    Ok(())
}

fn run_remove(config: &Config, group: &str) -> Result<()> {
    manager(config)
        .remove_group(group)
        .with_context(|| format!("Failed to remove {}", group))?;

    println!("{}", format!("✅ Removed {}", group).green());
    Ok(())
}

fn run_stats(config: &Config, group: &str, json: bool) -> Result<()> {
    let report = manager(config)
        .stats(group)
        .with_context(|| format!("Failed to read statistics of {}", group))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(group, &report);
    }
    Ok(())
}

fn print_report(group: &str, report: &MemoryReport) {
    println!("{}", format!("=== Memory: {} ===", group).green().bold());
    print_data("Memory", &report.usage);
    print_data("Swap", &report.swap_usage);
    print_data("Kernel", &report.kernel_usage);
    println!("  {:<8} {}", "Cache:", format_bytes(report.cache));

    if !report.stats.is_empty() {
        println!("\n{}", "memory.stat:".cyan());
        let mut keys: Vec<_> = report.stats.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {:<28} {}", key, report.stats[key]);
        }
    }
}

fn print_data(label: &str, data: &MemoryData) {
    let failcnt = if data.failcnt > 0 {
        data.failcnt.to_string().red()
    } else {
        data.failcnt.to_string().normal()
    };
    println!(
        "  {:<8} usage {}, peak {}, failcnt {}",
        format!("{}:", label),
        format_bytes(data.usage),
        format_bytes(data.max_usage),
        failcnt
    );
}

fn generate_config(output: &Path) -> Result<()> {
    Config::default()
        .save_to_file(output)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration file: {}", e))?;

    println!("Configuration written to {:?}", output);
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::load_from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration file: {}", e))
}
