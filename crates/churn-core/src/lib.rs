pub mod config;
pub mod encoding;
pub mod error;
pub mod insights;
pub mod model;
pub mod model_runtime;
pub mod pipeline;
pub mod predictor;
pub mod schema;
pub mod util;

pub use encoding::{encode, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use error::{ChurnError, EncodingError, PredictionError, StartupError};
pub use model::Classifier;
pub use pipeline::AppCore;
pub use schema::{CustomerRecord, PredictionResponse, RawCustomerRecord};

/// Install the process-wide `tracing` subscriber (`RUST_LOG` overrides `info`).
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
