use activity_stack::host::{LoopbackDriver, LoopbackHost};
use activity_stack::{
    ActivityInfo, ActivityManager, ApplicationInfo, ComponentName, Intent, LaunchRequest,
    ManagerConfig, flags, spawn_message_pump,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Boot an activity stack on the in-process loopback host, launch a few
/// components and print the resulting stack as JSON.
#[derive(Parser, Debug)]
#[command(name = "activity-stack", version)]
struct Args {
    /// JSON manager configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Home component, `package/class`
    #[arg(long, default_value = "com.example.launcher/.Home")]
    home: String,

    /// Components to launch after home, `package/class`
    #[arg(long = "launch")]
    launch: Vec<String>,

    /// Finish the top activity before dumping
    #[arg(long)]
    finish_top: bool,

    /// Time given to the loopback host to acknowledge everything
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ManagerConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ManagerConfig::default(),
    };

    let (host, events) = LoopbackHost::new();
    let manager = ActivityManager::new(config, host.clone(), host)
        .context("failed to start activity manager")?;
    let driver = LoopbackDriver::spawn(manager.clone(), events);
    let pump = spawn_message_pump(manager.clone());

    let home = parse_component(&args.home)?;
    let home_token = manager
        .launch(LaunchRequest::new(
            Intent::home().component(home.clone()),
            activity_info(&home),
        ))
        .await;
    info!(token = %home_token, component = %home, "home launched");
    settle(args.settle_ms).await;

    for name in &args.launch {
        let component = parse_component(name)?;
        let intent = Intent::new()
            .component(component.clone())
            .add_flags(flags::NEW_TASK);
        let token = manager
            .launch(LaunchRequest::new(intent, activity_info(&component)).component_specified(true))
            .await;
        info!(token = %token, component = %component, "activity launched");
        settle(args.settle_ms).await;
    }

    if args.finish_top {
        if let Some(top) = manager.top_activity().await {
            manager.finish(top, None).await;
            settle(args.settle_ms).await;
        }
    }

    let dump = manager.dump().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("failed to serialize stack dump")?
    );
    info!("{}", dump.stats);

    pump.stop().await.context("message pump failed")?;
    driver.stop().await.context("loopback driver failed")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("activity_stack=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_component(name: &str) -> Result<ComponentName> {
    match ComponentName::unflatten(name) {
        Some(component) => Ok(component),
        None => bail!("invalid component '{}', expected package/class", name),
    }
}

fn activity_info(component: &ComponentName) -> ActivityInfo {
    ActivityInfo::new(ApplicationInfo::new(&component.package, 10_001), &component.class)
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
