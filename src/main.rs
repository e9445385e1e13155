use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rs_wildfly::{
    Address, Administration, InventoryConfig, Operations, Plan, ServerManager, StepStatus,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rs-wildfly", version, about = "Apply configuration to WildFly servers over SSH")]
struct Cli {
    /// 清单文件（YAML，扩展名为 .json 时按 JSON 解析）
    #[arg(short, long, env = "RS_WILDFLY_INVENTORY", default_value = "inventory.yml")]
    inventory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 在选中的服务器上执行计划（未选择时为全部服务器）
    Apply {
        plan: PathBuf,
        #[arg(short, long = "server")]
        servers: Vec<String>,
        #[arg(short, long = "group")]
        groups: Vec<String>,
        #[arg(long, default_value_t = 10)]
        max_concurrent: usize,
    },
    /// 检查资源是否存在
    Exists { server: String, address: Address },
    ReadAttribute {
        server: String,
        address: Address,
        name: String,
        #[arg(long)]
        include_defaults: bool,
    },
    ReadChildren {
        server: String,
        address: Address,
        child_type: String,
    },
    /// 服务器处于 reload-required 时重载
    ReloadIfRequired { server: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();
    let inventory = InventoryConfig::from_file(&cli.inventory)
        .with_context(|| format!("loading inventory {}", cli.inventory.display()))?;

    match cli.command {
        Commands::Apply {
            plan,
            servers,
            groups,
            max_concurrent,
        } => {
            let plan = Plan::from_yaml_file(&plan)
                .with_context(|| format!("loading plan {}", plan.display()))?;
            let targets = inventory.select(&servers, &groups)?;
            let manager =
                ServerManager::from_inventory(&inventory).with_max_concurrent_connections(max_concurrent);

            let batch = manager.apply_plan(&plan, &targets).await;
            for name in &targets {
                match batch.results.get(name) {
                    Some(Ok(result)) => {
                        println!("{}: ok ({} step(s) applied)", name, result.applied_count());
                        for step in &result.steps {
                            if let StepStatus::Ignored(e) = &step.status {
                                println!("  ignored '{}': {}", step.name, e);
                            }
                        }
                    }
                    Some(Err(e)) => println!("{}: FAILED {}", name, e),
                    None => println!("{}: no result", name),
                }
            }
            if !batch.failed.is_empty() {
                bail!("plan '{}' failed on {} server(s)", plan.name, batch.failed.len());
            }
        }
        Commands::Exists { server, address } => {
            let client = connect(&inventory, &server)?;
            println!("{}", Operations::new(&client).exists(&address)?);
        }
        Commands::ReadAttribute {
            server,
            address,
            name,
            include_defaults,
        } => {
            let client = connect(&inventory, &server)?;
            let ops = Operations::new(&client);
            let result = if include_defaults {
                ops.read_attribute_with_defaults(&address, &name)?
            } else {
                ops.read_attribute(&address, &name)?
            };
            println!("{}", serde_json::to_string_pretty(result.value())?);
        }
        Commands::ReadChildren {
            server,
            address,
            child_type,
        } => {
            let client = connect(&inventory, &server)?;
            let result = Operations::new(&client).read_children_names(&address, &child_type)?;
            for child in result.string_list_value().unwrap_or_default() {
                println!("{}", child);
            }
        }
        Commands::ReloadIfRequired { server } => {
            let client = connect(&inventory, &server)?;
            let reloaded = Administration::new(&client).reload_if_required()?;
            println!("{}", if reloaded { "reloaded" } else { "no reload needed" });
        }
    }

    Ok(())
}

fn connect(inventory: &InventoryConfig, server: &str) -> Result<rs_wildfly::OnlineManagementClient> {
    ServerManager::from_inventory(inventory)
        .connect(server)
        .with_context(|| format!("connecting to {}", server))
}
