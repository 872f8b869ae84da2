//! Customer record -> dense feature row.
//!
//! The column order below is the order the classifier was trained on. Moving a
//! column silently produces wrong predictions, so the layout is fixed here and
//! model artifacts are checked against [`FEATURE_NAMES`] at load time.
//!
//! | cols  | encoding                                   |
//! |-------|--------------------------------------------|
//! | 0-3   | binary demographics                        |
//! | 4     | tenure (months)                            |
//! | 5     | phone service (binary)                     |
//! | 6     | multiple lines (ternary)                   |
//! | 7-12  | internet add-ons (ternary)                 |
//! | 13    | paperless billing (binary)                 |
//! | 14-15 | monthly / total charges                    |
//! | 16-18 | internet service one-hot                   |
//! | 19-22 | payment method one-hot                     |
//! | 23-25 | contract one-hot                           |

use std::ops::Index;

use crate::schema::{Contract, CustomerRecord, InternetService, OneHot, PaymentMethod};

pub const FEATURE_COUNT: usize = 26;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "MultipleLines",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "PaperlessBilling",
    "MonthlyCharges",
    "TotalCharges",
    "InternetService_DSL",
    "InternetService_Fiber optic",
    "InternetService_No",
    "PaymentMethod_Bank transfer (automatic)",
    "PaymentMethod_Credit card (automatic)",
    "PaymentMethod_Electronic check",
    "PaymentMethod_Mailed check",
    "Contract_Month-to-month",
    "Contract_One year",
    "Contract_Two year",
];

pub mod col {
    pub const GENDER: usize = 0;
    pub const SENIOR_CITIZEN: usize = 1;
    pub const PARTNER: usize = 2;
    pub const DEPENDENTS: usize = 3;
    pub const TENURE: usize = 4;
    pub const PHONE_SERVICE: usize = 5;
    pub const MULTIPLE_LINES: usize = 6;
    pub const ONLINE_SECURITY: usize = 7;
    pub const ONLINE_BACKUP: usize = 8;
    pub const DEVICE_PROTECTION: usize = 9;
    pub const TECH_SUPPORT: usize = 10;
    pub const STREAMING_TV: usize = 11;
    pub const STREAMING_MOVIES: usize = 12;
    pub const PAPERLESS_BILLING: usize = 13;
    pub const MONTHLY_CHARGES: usize = 14;
    pub const TOTAL_CHARGES: usize = 15;
    pub const INTERNET_SERVICE: usize = 16;
    pub const PAYMENT_METHOD: usize = 19;
    pub const CONTRACT: usize = 23;
}

/// Fixed-order feature row; always exactly [`FEATURE_COUNT`] values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// (column name, value) pairs, for logs and the CLI.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }

    /// The hot block for a one-hot group.
    pub fn block<T: OneHot>(&self, start: usize) -> &[f64] {
        &self.0[start..start + T::WIDTH]
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// Encode a validated record. Pure and infallible: all domain checks happen
/// when the record is built from its raw form.
pub fn encode(rec: &CustomerRecord) -> FeatureVector {
    let mut row = [0.0f64; FEATURE_COUNT];

    row[col::GENDER] = rec.gender.bit();
    row[col::SENIOR_CITIZEN] = rec.senior_citizen.bit();
    row[col::PARTNER] = rec.partner.bit();
    row[col::DEPENDENTS] = rec.dependents.bit();
    row[col::TENURE] = f64::from(rec.tenure);
    row[col::PHONE_SERVICE] = rec.phone_service.bit();
    row[col::MULTIPLE_LINES] = rec.multiple_lines.code();

    let addons = [
        rec.online_security,
        rec.online_backup,
        rec.device_protection,
        rec.tech_support,
        rec.streaming_tv,
        rec.streaming_movies,
    ];
    for (i, level) in addons.into_iter().enumerate() {
        row[col::ONLINE_SECURITY + i] = level.code();
    }

    row[col::PAPERLESS_BILLING] = rec.paperless_billing.bit();
    row[col::MONTHLY_CHARGES] = rec.monthly_charges;
    row[col::TOTAL_CHARGES] = rec.total_charges;

    set_hot::<InternetService>(&mut row, col::INTERNET_SERVICE, rec.internet_service);
    set_hot::<PaymentMethod>(&mut row, col::PAYMENT_METHOD, rec.payment_method);
    set_hot::<Contract>(&mut row, col::CONTRACT, rec.contract);

    FeatureVector(row)
}

#[inline]
fn set_hot<T: OneHot>(row: &mut [f64; FEATURE_COUNT], start: usize, v: T) {
    row[start + v.index()] = 1.0;
}
