use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::{
    config::Config,
    encoding::{self, FeatureVector},
    error::{ChurnError, ChurnResult, StartupError},
    insights,
    model::Classifier,
    model_runtime::ModelRuntime,
    predictor::{self, Prediction},
    schema::{CustomerRecord, Label, PredictionResponse, RawCustomerRecord, TimingsUs},
    util::{now_us, percent},
};

/// What `/healthz` reports about the loaded model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kind: &'static str,
    pub n_features: usize,
    pub model_path: Option<PathBuf>,
    pub schema_checked: bool,
}

/// 一次提交 = validate -> encode -> predict -> insights；无共享可变状态
#[derive(Debug, Clone)]
pub struct AppCore {
    pub cfg: Config,
    pub classifier: Arc<dyn Classifier>,
    pub info: ModelInfo,
}

impl AppCore {
    pub fn new(cfg: Config, classifier: Arc<dyn Classifier>) -> Self {
        let info = ModelInfo {
            kind: classifier.kind(),
            n_features: classifier.n_features(),
            model_path: None,
            schema_checked: false,
        };
        Self {
            cfg,
            classifier,
            info,
        }
    }

    /// Load the artifact under `cfg.model_dir`. Failing here must abort start-up.
    pub fn load(cfg: Config) -> Result<Self, StartupError> {
        let rt = ModelRuntime::load_from_dir(&cfg.model_dir)?;
        let classifier: Arc<dyn Classifier> = Arc::new(rt.model);
        let info = ModelInfo {
            kind: classifier.kind(),
            n_features: classifier.n_features(),
            model_path: Some(rt.model_path),
            schema_checked: rt.schema_checked,
        };
        Ok(Self {
            cfg,
            classifier,
            info,
        })
    }

    /// Full cycle for one submission.
    pub fn predict(&self, raw: &RawCustomerRecord) -> ChurnResult<PredictionResponse> {
        let t0 = Instant::now();
        let mut timings = TimingsUs::default();

        // validate（类别 / 取值范围）
        let t_val = Instant::now();
        let rec = CustomerRecord::try_from(raw).map_err(|e| {
            metrics::counter!("encoding_faults_total").increment(1);
            tracing::info!(err = %e, "rejected submission");
            ChurnError::from(e)
        })?;
        timings.validate = now_us(t_val);
        metrics::histogram!("stage_validate_us").record(timings.validate as f64);

        let resp = self.predict_record(&rec, timings)?;
        metrics::histogram!("e2e_us").record(now_us(t0) as f64);
        Ok(resp)
    }

    /// Same cycle for an already validated record.
    pub fn predict_record(
        &self,
        rec: &CustomerRecord,
        mut timings: TimingsUs,
    ) -> ChurnResult<PredictionResponse> {
        let trace_id = Uuid::new_v4();

        // encode
        let t_enc = Instant::now();
        let row: FeatureVector = encoding::encode(rec);
        timings.encode = now_us(t_enc);
        metrics::histogram!("stage_encode_us").record(timings.encode as f64);

        // predict
        let t_pred = Instant::now();
        let pred = predictor::predict(self.classifier.as_ref(), &row).map_err(|e| {
            metrics::counter!("prediction_faults_total").increment(1);
            tracing::error!(%trace_id, err = %e, "prediction failed");
            ChurnError::from(e)
        })?;
        timings.predict = now_us(t_pred);
        metrics::histogram!("stage_predict_us").record(timings.predict as f64);

        // insights（只读编码后的行，不影响预测）
        let t_ins = Instant::now();
        let reason = insights::evaluate(&row, &self.cfg.insights)
            .into_iter()
            .map(|i| i.to_reason(&self.cfg.insights))
            .collect();
        timings.insights = now_us(t_ins);
        metrics::histogram!("stage_insights_us").record(timings.insights as f64);

        metrics::counter!("predictions_total", "label" => pred.label.as_str()).increment(1);
        tracing::debug!(
            %trace_id,
            label = pred.label.as_str(),
            churn_probability = pred.churn_probability(),
            "prediction"
        );

        let (headline, advice) = headline(&pred);
        Ok(PredictionResponse {
            trace_id,
            label: pred.label,
            probabilities: pred.probabilities,
            churn_probability: pred.churn_probability(),
            headline,
            advice,
            reason,
            timings_us: timings,
        })
    }
}

fn headline(pred: &Prediction) -> (String, String) {
    match pred.label {
        Label::Churn => (
            format!("High Churn Risk: {} probability", percent(pred.label_probability())),
            "This customer is likely to leave! Take immediate action.".to_string(),
        ),
        Label::NoChurn => (
            format!("Low Churn Risk: {} probability", percent(pred.label_probability())),
            "This customer is likely to stay with us.".to_string(),
        ),
    }
}
