use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use churn_core::{config::Config, AppCore};
use churn_server_tokio::{router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config)
    #[arg(long)]
    bind: Option<String>,

    /// Model artifact directory (overrides the config)
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    churn_core::init_tracing();
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }
    if let Some(dir) = args.model_dir {
        cfg.model_dir = dir;
    }

    // 模型加载失败 = 启动失败：不接受任何输入
    let core = match AppCore::load(cfg.clone()) {
        Ok(core) => Arc::new(core),
        Err(e) => {
            tracing::error!(model_dir = %cfg.model_dir.display(), err = %e, "startup fault");
            return Err(e).context("load churn model");
        }
    };

    let prom = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;

    let state = AppState {
        core,
        prom: Some(prom),
    };
    let app = router(state);

    let addr: SocketAddr = cfg
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", cfg.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("churn-server-tokio listening on http://{addr}");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
