use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

use churn_core::{config::Config, encode, AppCore, CustomerRecord, RawCustomerRecord};

/// Predict churn for one customer record (JSON, training column names as keys).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model artifact directory (overrides the config)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Record file, or `-` for stdin
    #[arg(long, default_value = "-")]
    record: String,

    /// Print the full response as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Also print the encoded feature row
    #[arg(long, default_value_t = false)]
    show_features: bool,
}

fn main() -> anyhow::Result<()> {
    churn_core::init_tracing();
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.model_dir {
        cfg.model_dir = dir;
    }

    let core = AppCore::load(cfg.clone())
        .with_context(|| format!("load model from {}", cfg.model_dir.display()))?;

    let text = if args.record == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read record from stdin")?;
        s
    } else {
        std::fs::read_to_string(&args.record)
            .with_context(|| format!("read record: {}", args.record))?
    };
    let raw: RawCustomerRecord = serde_json::from_str(&text).context("parse record json")?;

    if args.show_features {
        let rec = CustomerRecord::try_from(&raw)?;
        for (i, (name, v)) in encode(&rec).named().enumerate() {
            println!("  {i:>2} {name:<42} {v}");
        }
    }

    let resp = core.predict(&raw)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        return Ok(());
    }

    println!("{}", resp.headline);
    println!("{}", resp.advice);
    println!("Churn Probability: {}", churn_core::util::percent(resp.churn_probability));
    if !resp.reason.is_empty() {
        println!("Key factors:");
        for r in &resp.reason {
            println!("  - {}: {}", r.title, r.message);
        }
    }
    Ok(())
}
