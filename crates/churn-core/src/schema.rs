// crates/churn-core/src/schema.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EncodingError;
use crate::insights::Insight;

/// 表单控件的取值范围（与训练数据一致）
pub const TENURE_RANGE: (i64, i64) = (0, 72);
pub const MONTHLY_CHARGES_RANGE: (f64, f64) = (0.0, 200.0);
pub const TOTAL_CHARGES_RANGE: (f64, f64) = (0.0, 10_000.0);

pub const NO_PHONE_SERVICE: &str = "No phone service";
pub const NO_INTERNET_SERVICE: &str = "No internet service";

/// A closed set of human-readable labels.
///
/// Parsing is exact: the submitted string must equal one of the labels, there
/// is no fallback bucket.
pub trait Category: Copy + Eq + Sized + 'static {
    const VARIANTS: &'static [Self];

    fn label(self) -> &'static str;

    fn labels() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|v| v.label()).collect()
    }

    fn parse(field: &'static str, value: &str) -> Result<Self, EncodingError> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.label() == value)
            .ok_or_else(|| EncodingError::UnknownCategory {
                field,
                value: value.to_string(),
                expected: Self::labels(),
            })
    }
}

/// Categories encoded as a one-hot block; `index` is the hot position inside the block.
pub trait OneHot: Category {
    const WIDTH: usize;

    fn index(self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Category for Gender {
    const VARIANTS: &'static [Self] = &[Gender::Female, Gender::Male];

    fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

impl Gender {
    #[inline]
    pub fn bit(self) -> f64 {
        match self {
            Gender::Female => 0.0,
            Gender::Male => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    No,
    Yes,
}

impl Category for YesNo {
    const VARIANTS: &'static [Self] = &[YesNo::No, YesNo::Yes];

    fn label(self) -> &'static str {
        match self {
            YesNo::No => "No",
            YesNo::Yes => "Yes",
        }
    }
}

impl YesNo {
    #[inline]
    pub fn bit(self) -> f64 {
        match self {
            YesNo::No => 0.0,
            YesNo::Yes => 1.0,
        }
    }
}

/// Three-way add-on answer shared by `MultipleLines` and the six internet add-ons.
///
/// The third label differs per field ("No phone service" / "No internet
/// service") but always encodes to 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLevel {
    No,
    Yes,
    NotAvailable,
}

impl ServiceLevel {
    pub const ALL: [ServiceLevel; 3] = [ServiceLevel::No, ServiceLevel::Yes, ServiceLevel::NotAvailable];

    #[inline]
    pub fn code(self) -> f64 {
        match self {
            ServiceLevel::No => 0.0,
            ServiceLevel::Yes => 1.0,
            ServiceLevel::NotAvailable => 2.0,
        }
    }

    pub fn label(self, not_available: &'static str) -> &'static str {
        match self {
            ServiceLevel::No => "No",
            ServiceLevel::Yes => "Yes",
            ServiceLevel::NotAvailable => not_available,
        }
    }

    pub fn labels(not_available: &'static str) -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.label(not_available)).collect()
    }

    pub fn parse(
        field: &'static str,
        value: &str,
        not_available: &'static str,
    ) -> Result<Self, EncodingError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label(not_available) == value)
            .ok_or_else(|| EncodingError::UnknownCategory {
                field,
                value: value.to_string(),
                expected: Self::labels(not_available),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternetService {
    Dsl,
    FiberOptic,
    None,
}

impl Category for InternetService {
    const VARIANTS: &'static [Self] = &[
        InternetService::Dsl,
        InternetService::FiberOptic,
        InternetService::None,
    ];

    fn label(self) -> &'static str {
        match self {
            InternetService::Dsl => "DSL",
            InternetService::FiberOptic => "Fiber optic",
            InternetService::None => "No",
        }
    }
}

impl OneHot for InternetService {
    const WIDTH: usize = 3;

    fn index(self) -> usize {
        match self {
            InternetService::Dsl => 0,
            InternetService::FiberOptic => 1,
            InternetService::None => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    ElectronicCheck,
    MailedCheck,
}

impl Category for PaymentMethod {
    const VARIANTS: &'static [Self] = &[
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditCard,
        PaymentMethod::ElectronicCheck,
        PaymentMethod::MailedCheck,
    ];

    fn label(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "Bank transfer (automatic)",
            PaymentMethod::CreditCard => "Credit card (automatic)",
            PaymentMethod::ElectronicCheck => "Electronic check",
            PaymentMethod::MailedCheck => "Mailed check",
        }
    }
}

impl OneHot for PaymentMethod {
    const WIDTH: usize = 4;

    fn index(self) -> usize {
        match self {
            PaymentMethod::BankTransfer => 0,
            PaymentMethod::CreditCard => 1,
            PaymentMethod::ElectronicCheck => 2,
            PaymentMethod::MailedCheck => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    MonthToMonth,
    OneYear,
    TwoYear,
}

impl Category for Contract {
    const VARIANTS: &'static [Self] = &[Contract::MonthToMonth, Contract::OneYear, Contract::TwoYear];

    fn label(self) -> &'static str {
        match self {
            Contract::MonthToMonth => "Month-to-month",
            Contract::OneYear => "One year",
            Contract::TwoYear => "Two year",
        }
    }
}

impl OneHot for Contract {
    const WIDTH: usize = 3;

    fn index(self) -> usize {
        match self {
            Contract::MonthToMonth => 0,
            Contract::OneYear => 1,
            Contract::TwoYear => 2,
        }
    }
}

/// 提交的原始表单 / JSON body：字段名与训练列名一致，类别仍是字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    pub gender: String,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "Contract")]
    pub contract: String,
}

impl Default for RawCustomerRecord {
    /// Initial state of the input form.
    fn default() -> Self {
        Self {
            gender: "Female".into(),
            senior_citizen: "No".into(),
            partner: "No".into(),
            dependents: "No".into(),
            tenure: 12,
            phone_service: "No".into(),
            multiple_lines: "No".into(),
            online_security: "No".into(),
            online_backup: "No".into(),
            device_protection: "No".into(),
            tech_support: "No".into(),
            streaming_tv: "No".into(),
            streaming_movies: "No".into(),
            paperless_billing: "No".into(),
            monthly_charges: 50.0,
            total_charges: 500.0,
            internet_service: "DSL".into(),
            payment_method: "Bank transfer (automatic)".into(),
            contract: "Month-to-month".into(),
        }
    }
}

/// A validated customer record. Every field is inside its declared domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomerRecord {
    pub gender: Gender,
    pub senior_citizen: YesNo,
    pub partner: YesNo,
    pub dependents: YesNo,
    pub tenure: u32,
    pub phone_service: YesNo,
    pub multiple_lines: ServiceLevel,
    pub online_security: ServiceLevel,
    pub online_backup: ServiceLevel,
    pub device_protection: ServiceLevel,
    pub tech_support: ServiceLevel,
    pub streaming_tv: ServiceLevel,
    pub streaming_movies: ServiceLevel,
    pub paperless_billing: YesNo,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub internet_service: InternetService,
    pub payment_method: PaymentMethod,
    pub contract: Contract,
}

impl TryFrom<&RawCustomerRecord> for CustomerRecord {
    type Error = EncodingError;

    fn try_from(raw: &RawCustomerRecord) -> Result<Self, Self::Error> {
        let internet = |field, v: &str| ServiceLevel::parse(field, v, NO_INTERNET_SERVICE);

        Ok(Self {
            gender: Gender::parse("gender", &raw.gender)?,
            senior_citizen: YesNo::parse("SeniorCitizen", &raw.senior_citizen)?,
            partner: YesNo::parse("Partner", &raw.partner)?,
            dependents: YesNo::parse("Dependents", &raw.dependents)?,
            tenure: check_tenure(raw.tenure)?,
            phone_service: YesNo::parse("PhoneService", &raw.phone_service)?,
            multiple_lines: ServiceLevel::parse("MultipleLines", &raw.multiple_lines, NO_PHONE_SERVICE)?,
            online_security: internet("OnlineSecurity", &raw.online_security)?,
            online_backup: internet("OnlineBackup", &raw.online_backup)?,
            device_protection: internet("DeviceProtection", &raw.device_protection)?,
            tech_support: internet("TechSupport", &raw.tech_support)?,
            streaming_tv: internet("StreamingTV", &raw.streaming_tv)?,
            streaming_movies: internet("StreamingMovies", &raw.streaming_movies)?,
            paperless_billing: YesNo::parse("PaperlessBilling", &raw.paperless_billing)?,
            monthly_charges: check_amount("MonthlyCharges", raw.monthly_charges, MONTHLY_CHARGES_RANGE)?,
            total_charges: check_amount("TotalCharges", raw.total_charges, TOTAL_CHARGES_RANGE)?,
            internet_service: InternetService::parse("InternetService", &raw.internet_service)?,
            payment_method: PaymentMethod::parse("PaymentMethod", &raw.payment_method)?,
            contract: Contract::parse("Contract", &raw.contract)?,
        })
    }
}

impl TryFrom<RawCustomerRecord> for CustomerRecord {
    type Error = EncodingError;

    fn try_from(raw: RawCustomerRecord) -> Result<Self, Self::Error> {
        CustomerRecord::try_from(&raw)
    }
}

fn check_tenure(v: i64) -> Result<u32, EncodingError> {
    let (min, max) = TENURE_RANGE;
    if !(min..=max).contains(&v) {
        return Err(EncodingError::OutOfRange {
            field: "tenure",
            value: v as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(v as u32)
}

fn check_amount(field: &'static str, v: f64, (min, max): (f64, f64)) -> Result<f64, EncodingError> {
    if !v.is_finite() {
        return Err(EncodingError::NotFinite { field });
    }
    if v < min || v > max {
        return Err(EncodingError::OutOfRange {
            field,
            value: v,
            min,
            max,
        });
    }
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NoChurn,
    Churn,
}

impl Label {
    #[inline]
    pub fn is_churn(self) -> bool {
        matches!(self, Label::Churn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::NoChurn => "no_churn",
            Label::Churn => "churn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub no_churn: f64,
    pub churn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonItem {
    pub signal: Insight,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub trace_id: Uuid,
    pub label: Label,
    pub probabilities: ClassProbabilities,
    /// 正类（churn = yes）概率，便于直接展示
    pub churn_probability: f64,
    pub headline: String,
    pub advice: String,
    pub reason: Vec<ReasonItem>,
    /// 分段耗时（微秒）
    pub timings_us: TimingsUs,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TimingsUs {
    pub validate: u64,
    pub encode: u64,
    pub predict: u64,
    pub insights: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_state_is_valid() {
        let rec = CustomerRecord::try_from(&RawCustomerRecord::default()).unwrap();
        assert_eq!(rec.tenure, 12);
        assert_eq!(rec.internet_service, InternetService::Dsl);
        assert_eq!(rec.contract, Contract::MonthToMonth);
    }

    #[test]
    fn service_level_label_depends_on_field() {
        assert_eq!(ServiceLevel::NotAvailable.label(NO_PHONE_SERVICE), "No phone service");
        assert!(ServiceLevel::parse("MultipleLines", NO_INTERNET_SERVICE, NO_PHONE_SERVICE).is_err());
        assert_eq!(
            ServiceLevel::parse("TechSupport", "No internet service", NO_INTERNET_SERVICE).unwrap(),
            ServiceLevel::NotAvailable
        );
    }

    #[test]
    fn parse_is_exact() {
        assert!(Contract::parse("Contract", "month-to-month").is_err());
        assert!(YesNo::parse("Partner", "Yes ").is_err());
        assert_eq!(Gender::parse("gender", "Male").unwrap(), Gender::Male);
    }

    #[test]
    fn out_of_range_numbers_rejected() {
        let mut raw = RawCustomerRecord::default();
        raw.tenure = 73;
        assert!(matches!(
            CustomerRecord::try_from(&raw),
            Err(EncodingError::OutOfRange { field: "tenure", .. })
        ));

        let mut raw = RawCustomerRecord::default();
        raw.monthly_charges = f64::NAN;
        assert_eq!(
            CustomerRecord::try_from(&raw),
            Err(EncodingError::NotFinite { field: "MonthlyCharges" })
        );

        let mut raw = RawCustomerRecord::default();
        raw.total_charges = -0.01;
        assert!(CustomerRecord::try_from(&raw).is_err());
    }
}
