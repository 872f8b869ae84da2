//! Server-rendered input form and result block.
//!
//! Select options come straight from the category tables in `churn_core::schema`,
//! so the form can only offer values the encoder accepts.

use std::fmt::Write;

use churn_core::schema::{
    Category, Contract, Gender, InternetService, PaymentMethod, ServiceLevel, YesNo,
    MONTHLY_CHARGES_RANGE, NO_INTERNET_SERVICE, NO_PHONE_SERVICE, TENURE_RANGE,
    TOTAL_CHARGES_RANGE,
};
use churn_core::{util::percent, ChurnError, PredictionResponse, RawCustomerRecord};

/// What to show under the form.
pub enum Outcome<'a> {
    Empty,
    Predicted(&'a PredictionResponse),
    Failed(&'a ChurnError),
    BadRequest(&'a str),
}

const STYLE: &str = "body{font-family:sans-serif;max-width:860px;margin:2em auto;padding:0 1em}\
.cols{display:grid;grid-template-columns:1fr 1fr;gap:2em}\
label{display:block;margin:.4em 0}select,input{width:100%}\
.risk-high{background:#fdecea;padding:.8em}.risk-low{background:#e8f5e9;padding:.8em}\
.fault{background:#fff4e5;padding:.8em}";

pub fn render(raw: &RawCustomerRecord, outcome: Outcome<'_>) -> String {
    let mut h = String::with_capacity(8 * 1024);
    h.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    h.push_str("<title>Customer Churn Predictor</title>");
    let _ = write!(h, "<style>{STYLE}</style></head><body>");
    h.push_str("<h1>Customer Churn Prediction</h1>");
    h.push_str("<p>Enter the customer details below to predict the likelihood of churn.</p>");

    h.push_str("<form method=\"post\" action=\"/\"><h2>Customer Information</h2><div class=\"cols\"><div>");

    h.push_str("<h3>Personal Information</h3>");
    select(&mut h, "gender", "Gender", &Gender::labels(), &raw.gender);
    select(&mut h, "SeniorCitizen", "Senior Citizen", &YesNo::labels(), &raw.senior_citizen);
    select(&mut h, "Partner", "Partner", &YesNo::labels(), &raw.partner);
    select(&mut h, "Dependents", "Dependents", &YesNo::labels(), &raw.dependents);

    h.push_str("<h3>Account Information</h3>");
    let (tmin, tmax) = TENURE_RANGE;
    number(&mut h, "tenure", "Tenure (months)", tmin as f64, tmax as f64, "1", raw.tenure as f64);
    select(&mut h, "PaperlessBilling", "Paperless Billing", &YesNo::labels(), &raw.paperless_billing);

    h.push_str("<h3>Service Charges</h3>");
    let (mmin, mmax) = MONTHLY_CHARGES_RANGE;
    number(&mut h, "MonthlyCharges", "Monthly Charges ($)", mmin, mmax, "0.01", raw.monthly_charges);
    let (cmin, cmax) = TOTAL_CHARGES_RANGE;
    number(&mut h, "TotalCharges", "Total Charges ($)", cmin, cmax, "0.01", raw.total_charges);

    h.push_str("</div><div>");

    h.push_str("<h3>Phone Services</h3>");
    select(&mut h, "PhoneService", "Phone Service", &YesNo::labels(), &raw.phone_service);
    let lines = ServiceLevel::labels(NO_PHONE_SERVICE);
    select(&mut h, "MultipleLines", "Multiple Lines", &lines, &raw.multiple_lines);

    h.push_str("<h3>Internet Services</h3>");
    select(
        &mut h,
        "InternetService",
        "Internet Service Type",
        &InternetService::labels(),
        &raw.internet_service,
    );

    h.push_str("<h3>Additional Services</h3>");
    let addon = ServiceLevel::labels(NO_INTERNET_SERVICE);
    select(&mut h, "OnlineSecurity", "Online Security", &addon, &raw.online_security);
    select(&mut h, "OnlineBackup", "Online Backup", &addon, &raw.online_backup);
    select(&mut h, "DeviceProtection", "Device Protection", &addon, &raw.device_protection);
    select(&mut h, "TechSupport", "Tech Support", &addon, &raw.tech_support);
    select(&mut h, "StreamingTV", "Streaming TV", &addon, &raw.streaming_tv);
    select(&mut h, "StreamingMovies", "Streaming Movies", &addon, &raw.streaming_movies);

    h.push_str("<h3>Contract &amp; Payment</h3>");
    select(&mut h, "Contract", "Contract Type", &Contract::labels(), &raw.contract);
    select(&mut h, "PaymentMethod", "Payment Method", &PaymentMethod::labels(), &raw.payment_method);

    h.push_str("</div></div><p><button type=\"submit\">Predict Churn</button></p></form>");

    outcome_block(&mut h, outcome);

    h.push_str("</body></html>");
    h
}

fn select(h: &mut String, name: &str, label: &str, options: &[&str], current: &str) {
    let _ = write!(h, "<label>{label}<select name=\"{name}\">");
    for opt in options {
        let sel = if *opt == current { " selected" } else { "" };
        let opt = escape(opt);
        let _ = write!(h, "<option value=\"{opt}\"{sel}>{opt}</option>");
    }
    h.push_str("</select></label>");
}

fn number(h: &mut String, name: &str, label: &str, min: f64, max: f64, step: &str, value: f64) {
    let _ = write!(
        h,
        "<label>{label}<input type=\"number\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" required></label>"
    );
}

fn outcome_block(h: &mut String, outcome: Outcome<'_>) {
    match outcome {
        Outcome::Empty => {}
        Outcome::Predicted(resp) => {
            let class = if resp.label.is_churn() { "risk-high" } else { "risk-low" };
            let _ = write!(
                h,
                "<h2>Prediction Result</h2><div class=\"{class}\"><strong>{}</strong><p>{}</p></div>",
                escape(&resp.headline),
                escape(&resp.advice)
            );
            let _ = write!(
                h,
                "<p>Churn Probability: <strong>{}</strong></p>",
                percent(resp.churn_probability)
            );
            h.push_str("<h2>Key Factors Influencing This Prediction</h2>");
            h.push_str("<p>Based on churn analysis, these factors significantly impact customer retention:</p><ul>");
            for r in &resp.reason {
                let _ = write!(h, "<li><strong>{}</strong>: {}</li>", escape(&r.title), escape(&r.message));
            }
            h.push_str("</ul>");
        }
        Outcome::Failed(err) => {
            let _ = write!(h, "<div class=\"fault\"><p>{}</p>", escape(&err.to_string()));
            h.push_str("<p>Please check that all features are correctly configured.</p></div>");
        }
        Outcome::BadRequest(msg) => {
            let _ = write!(h, "<div class=\"fault\"><p>Invalid form submission: {}</p></div>", escape(msg));
        }
    }
}

/// Minimal HTML text/attribute escaping.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_marks_current_values() {
        let mut raw = RawCustomerRecord::default();
        raw.internet_service = "Fiber optic".into();
        let html = render(&raw, Outcome::Empty);
        assert!(html.contains("<option value=\"Fiber optic\" selected>"));
        assert!(html.contains("<option value=\"No internet service\">"));
        assert!(html.contains("<option value=\"No phone service\">"));
        assert!(html.contains("name=\"tenure\" min=\"0\" max=\"72\""));
        assert!(!html.contains("Prediction Result"));
    }

    #[test]
    fn form_has_nineteen_inputs() {
        let html = render(&RawCustomerRecord::default(), Outcome::Empty);
        let selects = html.matches("<select ").count();
        let numbers = html.matches("type=\"number\"").count();
        assert_eq!(selects + numbers, 19);
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }
}
