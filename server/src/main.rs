use anyhow::Context;
use chrono::{SubsecRound, Utc};
use clap::Parser;
use generator::scenario::ScenarioGenerator;
use log::info;
use rssicore::Monitor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ServiceConfig;
use workflow::runner::Runner;

mod generator;
mod http;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "RSSI fingerprint monitor for a fixed sensor network")]
struct Args {
    /// Load the service config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "0.0.0.0:5000")]
    bind: SocketAddr,
    /// Replay a synthetic scenario through the monitor and print the exclusions
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 12)]
    cycles: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Keep serving HTTP after an offline replay
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let service_config = if let Some(path) = args.config {
        ServiceConfig::load(path)?
    } else {
        ServiceConfig::from_args(args.bind, args.seed)
    };

    let monitor = Arc::new(
        Monitor::new(service_config.monitor.clone()).context("building signal monitor")?,
    );

    if args.offline {
        let runner = Runner::new(monitor.clone());
        let mut generator =
            ScenarioGenerator::new(service_config.scenario.clone(), monitor.config());
        let start = Utc::now().trunc_subsecs(0);
        let result = runner.execute(&mut generator, args.cycles, start)?;

        println!(
            "Offline replay -> cycles {}, fingerprints wifi {} bt {}, excluded wifi {:?} bt {:?}",
            result.cycles,
            result.status.fingerprinted.wifi,
            result.status.fingerprinted.bt,
            result.excluded.wifi,
            result.excluded.bt
        );
    }

    if args.serve || !args.offline {
        let routes = http::routes(monitor);
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for the HTTP service")?;
        runtime.block_on(async move {
            let (addr, server) = warp::serve(routes)
                .try_bind_with_graceful_shutdown(service_config.bind, async {
                    if let Err(err) = signal::ctrl_c().await {
                        log::error!("awaiting Ctrl+C failed: {}", err);
                    }
                })
                .with_context(|| format!("binding HTTP service to {}", service_config.bind))?;
            info!("monitor listening on {}", addr);
            println!("Monitor HTTP service on {} (Ctrl+C to stop)...", addr);
            server.await;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
