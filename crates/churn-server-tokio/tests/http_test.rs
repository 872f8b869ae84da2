use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use churn_core::config::Config;
use churn_core::model::{ChurnModel, Classifier, LinearModel, ModelSpec};
use churn_core::schema::Label;
use churn_core::{AppCore, PredictionError, FEATURE_COUNT};
use churn_server_tokio::{router, AppState};

fn app() -> Router {
    let mut coefficients = vec![0.0; FEATURE_COUNT];
    coefficients[23] = 3.0; // Contract_Month-to-month
    let model = ChurnModel::new(
        ModelSpec::Logistic(LinearModel {
            intercept: -1.0,
            coefficients,
        }),
        FEATURE_COUNT,
        0.5,
    )
    .unwrap();
    let core = AppCore::new(Config::default(), Arc::new(model));
    router(AppState {
        core: Arc::new(core),
        prom: None,
    })
}

#[derive(Debug)]
struct Broken;

impl Classifier for Broken {
    fn kind(&self) -> &'static str {
        "broken"
    }
    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }
    fn predict_proba(&self, _row: &[f64]) -> Result<[f64; 2], PredictionError> {
        panic!("weights unreadable")
    }
    fn predict(&self, _row: &[f64]) -> Result<Label, PredictionError> {
        Ok(Label::Churn)
    }
}

fn broken_app() -> Router {
    let core = AppCore::new(Config::default(), Arc::new(Broken));
    router(AppState {
        core: Arc::new(core),
        prom: None,
    })
}

const STAY_FORM: &str = "gender=Female&SeniorCitizen=No&Partner=Yes&Dependents=No&tenure=40\
&PhoneService=Yes&MultipleLines=Yes&OnlineSecurity=Yes&OnlineBackup=No\
&DeviceProtection=No&TechSupport=Yes&StreamingTV=No&StreamingMovies=No\
&PaperlessBilling=No&MonthlyCharges=55.5&TotalCharges=2220\
&InternetService=DSL&PaymentMethod=Credit+card+%28automatic%29&Contract=Two+year";

fn record() -> Value {
    json!({
        "gender": "Male", "SeniorCitizen": "No", "Partner": "No", "Dependents": "No",
        "tenure": 1, "PhoneService": "Yes", "MultipleLines": "No",
        "OnlineSecurity": "No", "OnlineBackup": "No", "DeviceProtection": "No",
        "TechSupport": "No", "StreamingTV": "No", "StreamingMovies": "No",
        "PaperlessBilling": "Yes", "MonthlyCharges": 95.0, "TotalCharges": 95.0,
        "InternetService": "Fiber optic", "PaymentMethod": "Electronic check",
        "Contract": "Month-to-month"
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::post("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn predict_json_ok() {
    let (status, body) = send(app(), post_json("/predict", &record())).await;
    assert_eq!(status, StatusCode::OK);

    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["label"], "churn");
    let p0 = v["probabilities"]["no_churn"].as_f64().unwrap();
    let p1 = v["probabilities"]["churn"].as_f64().unwrap();
    assert!((p0 + p1 - 1.0).abs() < 1e-9);
    assert_eq!(v["reason"].as_array().unwrap().len(), 6);
    assert_eq!(v["reason"][0]["signal"], "month_to_month_contract");
}

#[tokio::test]
async fn predict_json_unknown_category_is_422() {
    let mut rec = record();
    rec["InternetService"] = json!("Satellite");
    let (status, body) = send(app(), post_json("/predict", &rec)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["kind"], "encoding_fault");
    assert!(v["error"].as_str().unwrap().contains("InternetService"));
}

#[tokio::test]
async fn predict_json_missing_field_is_rejected() {
    let mut rec = record();
    rec.as_object_mut().unwrap().remove("Contract");
    let (status, body) = send(app(), post_json("/predict", &rec)).await;
    assert!(status.is_client_error());
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["kind"], "bad_request");
}

#[tokio::test]
async fn form_page_renders() {
    let req = Request::get("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Predict Churn"));
    assert!(body.contains("name=\"PaymentMethod\""));
}

#[tokio::test]
async fn form_submission_renders_result() {
    let (status, body) = send(app(), post_form(STAY_FORM)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Prediction Result"));
    assert!(body.contains("Low Churn Risk: 73.11% probability"));
    assert!(body.contains("<option value=\"Two year\" selected>"));
    assert!(!body.contains("<li>"));
}

#[tokio::test]
async fn form_submission_with_bad_value_shows_one_message() {
    let form = "gender=Other&SeniorCitizen=No&Partner=No&Dependents=No&tenure=5\
&PhoneService=No&MultipleLines=No+phone+service&OnlineSecurity=No&OnlineBackup=No\
&DeviceProtection=No&TechSupport=No&StreamingTV=No&StreamingMovies=No\
&PaperlessBilling=Yes&MonthlyCharges=20&TotalCharges=100\
&InternetService=DSL&PaymentMethod=Mailed+check&Contract=One+year";
    let (status, body) = send(app(), post_form(form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("class=\"fault\"").count(), 1);
    assert!(body.contains("gender: unknown value &quot;Other&quot;"));
    assert!(!body.contains("Prediction Result"));
}

#[tokio::test]
async fn form_submission_with_bad_number_keeps_other_values() {
    let form = STAY_FORM.replace("tenure=40", "tenure=forty");
    let (status, body) = send(app(), post_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("class=\"fault\"").count(), 1);
    assert!(body.contains("Invalid form submission: `tenure` is not a valid number"));
    assert!(!body.contains("Prediction Result"));
    // 其余字段保持用户输入
    assert!(body.contains("<option value=\"Two year\" selected>"));
    assert!(body.contains("name=\"MonthlyCharges\" min=\"0\" max=\"200\" step=\"0.01\" value=\"55.5\""));
}

#[tokio::test]
async fn form_submission_with_missing_field_is_reported() {
    let form = STAY_FORM.replace("&Contract=Two+year", "");
    let (status, body) = send(app(), post_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("missing field `Contract`"));
    assert!(body.contains("<option value=\"DSL\" selected>"));
    assert!(!body.contains("Prediction Result"));
}

#[tokio::test]
async fn predict_json_classifier_failure_is_500() {
    let (status, body) = send(broken_app(), post_json("/predict", &record())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["kind"], "prediction_fault");
    assert!(v["error"]
        .as_str()
        .unwrap()
        .starts_with("An error occurred during prediction: "));
}

#[tokio::test]
async fn form_submission_with_classifier_failure_shows_no_result() {
    let (status, body) = send(broken_app(), post_form(STAY_FORM)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("class=\"fault\"").count(), 1);
    assert!(body.contains("An error occurred during prediction: classifier panicked: weights unreadable"));
    assert!(!body.contains("Prediction Result"));
    assert!(!body.contains("Churn Probability"));
    assert!(!body.contains("<li>"));
}

#[tokio::test]
async fn healthz_reports_model() {
    let req = Request::get("/healthz").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["model"]["kind"], "logistic");
    assert_eq!(v["model"]["n_features"], 26);
}

#[tokio::test]
async fn app_loaded_from_artifact_dir() {
    let dir = tempfile::tempdir().unwrap();
    let model = json!({
        "kind": "logistic",
        "intercept": 0.0,
        "coefficients": vec![0.0; FEATURE_COUNT],
    });
    std::fs::write(dir.path().join("churn_model.json"), model.to_string()).unwrap();
    std::fs::write(
        dir.path().join("feature_names.json"),
        json!(churn_core::FEATURE_NAMES).to_string(),
    )
    .unwrap();

    let cfg = Config {
        model_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let core = AppCore::load(cfg).unwrap();
    let app = router(AppState {
        core: Arc::new(core),
        prom: None,
    });

    let req = Request::get("/healthz").body(Body::empty()).unwrap();
    let (_, body) = send(app.clone(), req).await;
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["model"]["schema_checked"], true);

    // p = 0.5 at threshold 0.5: a tie is no churn
    let (status, body) = send(app, post_json("/predict", &record())).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["label"], "no_churn");
    assert_eq!(v["churn_probability"], 0.5);
}
