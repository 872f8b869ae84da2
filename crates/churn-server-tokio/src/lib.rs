use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    routing::post,
    Form, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use churn_core::{AppCore, ChurnError, PredictionResponse, RawCustomerRecord};

pub mod page;

use page::Outcome;

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<AppCore>,
    /// None in tests: no global recorder installed
    pub prom: Option<PrometheusHandle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form).post(submit))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn form() -> Html<String> {
    Html(page::render(&RawCustomerRecord::default(), Outcome::Empty))
}

/// 表单提交：永远回 200 + 页面，错误以一条提示展示
async fn submit(
    State(st): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Html<String> {
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(rej) => {
            tracing::info!(err = %rej, "bad form submission");
            let msg = rej.body_text();
            return Html(page::render(
                &RawCustomerRecord::default(),
                Outcome::BadRequest(&msg),
            ));
        }
    };

    let (raw, problems) = read_form(&fields);
    if !problems.is_empty() {
        let msg = problems.join("; ");
        tracing::info!(err = %msg, "bad form submission");
        return Html(page::render(&raw, Outcome::BadRequest(&msg)));
    }

    let html = match st.core.predict(&raw) {
        Ok(resp) => page::render(&raw, Outcome::Predicted(&resp)),
        Err(e) => page::render(&raw, Outcome::Failed(&e)),
    };
    Html(html)
}

/// Overlay submitted fields on the form defaults.
///
/// Unlike `Form<RawCustomerRecord>`, a missing or unparsable field does not
/// discard the rest of the submission: it is listed in the returned problems
/// and the page keeps everything else the user entered.
pub fn read_form(fields: &HashMap<String, String>) -> (RawCustomerRecord, Vec<String>) {
    let mut raw = RawCustomerRecord::default();
    let mut problems = Vec::new();

    let text: [(&str, &mut String); 16] = [
        ("gender", &mut raw.gender),
        ("SeniorCitizen", &mut raw.senior_citizen),
        ("Partner", &mut raw.partner),
        ("Dependents", &mut raw.dependents),
        ("PhoneService", &mut raw.phone_service),
        ("MultipleLines", &mut raw.multiple_lines),
        ("OnlineSecurity", &mut raw.online_security),
        ("OnlineBackup", &mut raw.online_backup),
        ("DeviceProtection", &mut raw.device_protection),
        ("TechSupport", &mut raw.tech_support),
        ("StreamingTV", &mut raw.streaming_tv),
        ("StreamingMovies", &mut raw.streaming_movies),
        ("PaperlessBilling", &mut raw.paperless_billing),
        ("InternetService", &mut raw.internet_service),
        ("PaymentMethod", &mut raw.payment_method),
        ("Contract", &mut raw.contract),
    ];
    for (name, slot) in text {
        match fields.get(name) {
            Some(v) => *slot = v.clone(),
            None => problems.push(format!("missing field `{name}`")),
        }
    }

    number(fields, "tenure", &mut raw.tenure, &mut problems);
    number(fields, "MonthlyCharges", &mut raw.monthly_charges, &mut problems);
    number(fields, "TotalCharges", &mut raw.total_charges, &mut problems);

    (raw, problems)
}

fn number<T: FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
    slot: &mut T,
    problems: &mut Vec<String>,
) {
    match fields.get(name).map(|v| v.trim().parse::<T>()) {
        Some(Ok(v)) => *slot = v,
        Some(Err(_)) => problems.push(format!("`{name}` is not a valid number")),
        None => problems.push(format!("missing field `{name}`")),
    }
}

async fn predict(
    State(st): State<AppState>,
    body: Result<Json<RawCustomerRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(raw) = body.map_err(ApiError::BadRequest)?;
    let resp = st.core.predict(&raw)?;
    Ok(Json(resp))
}

async fn healthz(State(st): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "model": st.core.info }))
}

async fn metrics(State(st): State<AppState>) -> impl IntoResponse {
    match &st.prom {
        Some(prom) => (StatusCode::OK, prom.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

pub enum ApiError {
    BadRequest(JsonRejection),
    Churn(ChurnError),
}

impl From<ChurnError> for ApiError {
    fn from(e: ChurnError) -> Self {
        ApiError::Churn(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, msg) = match self {
            ApiError::BadRequest(rej) => (rej.status(), "bad_request", rej.body_text()),
            ApiError::Churn(e @ ChurnError::Encoding(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.kind(), e.to_string())
            }
            ApiError::Churn(e @ ChurnError::Prediction(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string())
            }
        };
        (status, Json(json!({ "error": msg, "kind": kind }))).into_response()
    }
}
