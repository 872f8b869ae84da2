//! Advisory "key factor" lines shown next to a prediction.
//!
//! Rules read the encoded row only and never feed back into the score.

use serde::{Deserialize, Serialize};

use crate::config::InsightThresholds;
use crate::encoding::{col, FeatureVector};
use crate::schema::{Contract, InternetService, OneHot, ReasonItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    MonthToMonthContract,
    FiberOpticInternet,
    NoTechSupport,
    ShortTenure,
    NoOnlineSecurity,
    HighMonthlyCharges,
}

impl Insight {
    pub fn title(self) -> &'static str {
        match self {
            Insight::MonthToMonthContract => "Contract Type",
            Insight::FiberOpticInternet => "Internet Service",
            Insight::NoTechSupport => "Tech Support",
            Insight::ShortTenure => "Tenure",
            Insight::NoOnlineSecurity => "Online Security",
            Insight::HighMonthlyCharges => "Monthly Charges",
        }
    }

    pub fn message(self, th: &InsightThresholds) -> String {
        match self {
            Insight::MonthToMonthContract => "Month-to-month contracts have higher churn risk".into(),
            Insight::FiberOpticInternet => "Fiber optic users tend to churn more".into(),
            Insight::NoTechSupport => "Lack of tech support increases churn risk".into(),
            Insight::ShortTenure => format!(
                "New customers (under {} months) have higher churn risk",
                th.short_tenure_months
            ),
            Insight::NoOnlineSecurity => "No online security increases churn risk".into(),
            Insight::HighMonthlyCharges => "Higher monthly charges may increase churn risk".into(),
        }
    }

    pub fn to_reason(self, th: &InsightThresholds) -> ReasonItem {
        ReasonItem {
            signal: self,
            title: self.title().to_string(),
            message: self.message(th),
        }
    }
}

/// Evaluate every rule against the encoded row.
pub fn evaluate(row: &FeatureVector, th: &InsightThresholds) -> Vec<Insight> {
    let mut out = Vec::with_capacity(6);

    let hot = |start: usize, idx: usize| row[start + idx] == 1.0;

    if hot(col::CONTRACT, Contract::MonthToMonth.index()) {
        out.push(Insight::MonthToMonthContract);
    }
    if hot(col::INTERNET_SERVICE, InternetService::FiberOptic.index()) {
        out.push(Insight::FiberOpticInternet);
    }
    // 0 == "No"；"No internet service"(2) 不算缺失
    if row[col::TECH_SUPPORT] == 0.0 {
        out.push(Insight::NoTechSupport);
    }
    if row[col::TENURE] < f64::from(th.short_tenure_months) {
        out.push(Insight::ShortTenure);
    }
    if row[col::ONLINE_SECURITY] == 0.0 {
        out.push(Insight::NoOnlineSecurity);
    }
    if row[col::MONTHLY_CHARGES] > th.high_monthly_charges {
        out.push(Insight::HighMonthlyCharges);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode;
    use crate::schema::{CustomerRecord, RawCustomerRecord};

    fn row(f: impl FnOnce(&mut RawCustomerRecord)) -> FeatureVector {
        let mut raw = RawCustomerRecord::default();
        f(&mut raw);
        encode(&CustomerRecord::try_from(&raw).unwrap())
    }

    #[test]
    fn loyal_customer_has_no_flags() {
        let r = row(|r| {
            r.contract = "Two year".into();
            r.internet_service = "DSL".into();
            r.tech_support = "Yes".into();
            r.online_security = "Yes".into();
            r.tenure = 48;
            r.monthly_charges = 70.0;
        });
        assert!(evaluate(&r, &InsightThresholds::default()).is_empty());
    }

    #[test]
    fn every_rule_fires() {
        let r = row(|r| {
            r.contract = "Month-to-month".into();
            r.internet_service = "Fiber optic".into();
            r.tenure = 11;
            r.monthly_charges = 70.01;
        });
        assert_eq!(
            evaluate(&r, &InsightThresholds::default()),
            vec![
                Insight::MonthToMonthContract,
                Insight::FiberOpticInternet,
                Insight::NoTechSupport,
                Insight::ShortTenure,
                Insight::NoOnlineSecurity,
                Insight::HighMonthlyCharges,
            ]
        );
    }

    #[test]
    fn no_internet_service_is_not_missing_support() {
        let r = row(|r| {
            r.internet_service = "No".into();
            r.tech_support = "No internet service".into();
            r.online_security = "No internet service".into();
        });
        let got = evaluate(&r, &InsightThresholds::default());
        assert!(!got.contains(&Insight::NoTechSupport));
        assert!(!got.contains(&Insight::NoOnlineSecurity));
    }

    #[test]
    fn tenure_boundary() {
        let th = InsightThresholds::default();
        assert!(evaluate(&row(|r| r.tenure = 12), &th)
            .iter()
            .all(|i| *i != Insight::ShortTenure));
        assert!(evaluate(&row(|r| r.tenure = 0), &th).contains(&Insight::ShortTenure));
    }

    #[test]
    fn reason_text() {
        let th = InsightThresholds::default();
        let r = Insight::ShortTenure.to_reason(&th);
        assert_eq!(r.title, "Tenure");
        assert_eq!(r.message, "New customers (under 12 months) have higher churn risk");
    }
}
