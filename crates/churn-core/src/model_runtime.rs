//! Loading a churn model artifact directory.
//!
//! Layout:
//!
//! ```text
//! <model_dir>/
//!   churn_model.json        # or churn_model.json.gz, or churn_model_v<N>.json (newest N wins)
//!   feature_names.json      # optional; or features.txt, one name per line
//!   policy.json             # optional; {"threshold": 0.5}
//! ```
//!
//! Every problem here is a start-up fault: the server refuses to start rather
//! than serve predictions from a model whose column layout it cannot verify.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::encoding::{FEATURE_COUNT, FEATURE_NAMES};
use crate::error::StartupError;
use crate::model::{ChurnModel, ModelSpec};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// p(churn) >= threshold -> Label::Churn
    pub threshold: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

fn select_model_file(dir: &Path) -> Option<PathBuf> {
    for name in ["churn_model.json", "churn_model.json.gz"] {
        let p = dir.join(name);
        if p.is_file() {
            return Some(p);
        }
    }

    // churn_model_v3.json / churn_model_v12.json ...：取最大版本
    let mut cands: Vec<(u32, PathBuf)> = vec![];
    if let Ok(rd) = fs::read_dir(dir) {
        for ent in rd.flatten() {
            let path = ent.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if let Some(rest) = name.strip_prefix("churn_model_v") {
                if let Some(rest) = rest.strip_suffix(".json") {
                    if let Ok(v) = rest.parse::<u32>() {
                        cands.push((v, path));
                    }
                }
            }
        }
    }
    cands.sort_by_key(|(v, _)| *v);
    cands.pop().map(|(_, p)| p)
}

fn read_text(path: &Path) -> Result<String, StartupError> {
    let io_err = |source| StartupError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let f = fs::File::open(path).map_err(io_err)?;
        let mut s = String::new();
        flate2::read::GzDecoder::new(f)
            .read_to_string(&mut s)
            .map_err(io_err)?;
        Ok(s)
    } else {
        fs::read_to_string(path).map_err(io_err)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, s: &str) -> Result<T, StartupError> {
    serde_json::from_str(s).map_err(|source| StartupError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Feature names shipped with the artifact, if any.
fn load_feature_names(dir: &Path) -> Result<Option<Vec<String>>, StartupError> {
    let json_path = dir.join("feature_names.json");
    if json_path.exists() {
        let s = read_text(&json_path)?;
        return parse_json(&json_path, &s).map(Some);
    }

    let txt_path = dir.join("features.txt");
    if txt_path.exists() {
        let s = read_text(&txt_path)?;
        let names = s
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        return Ok(Some(names));
    }

    Ok(None)
}

/// The artifact's column list must be exactly the encoder's, order included.
pub fn check_feature_names(names: &[String]) -> Result<(), StartupError> {
    if names.len() != FEATURE_COUNT {
        return Err(StartupError::FeatureCount {
            expected: FEATURE_COUNT,
            found: names.len(),
        });
    }
    for (index, (found, expected)) in names.iter().zip(FEATURE_NAMES).enumerate() {
        if found != expected {
            return Err(StartupError::FeatureName {
                index,
                expected,
                found: found.clone(),
            });
        }
    }
    Ok(())
}

fn load_policy(dir: &Path) -> Result<Policy, StartupError> {
    let p = dir.join("policy.json");
    if !p.exists() {
        return Ok(Policy::default());
    }
    let s = read_text(&p)?;
    parse_json(&p, &s)
}

/// A verified model artifact, ready to be shared read-only.
#[derive(Debug)]
pub struct ModelRuntime {
    pub model_path: PathBuf,
    pub policy: Policy,
    /// false when the artifact did not ship a feature list
    pub schema_checked: bool,
    pub model: ChurnModel,
}

impl ModelRuntime {
    pub fn load_from_dir(dir: &Path) -> Result<Self, StartupError> {
        let model_path = select_model_file(dir).ok_or_else(|| StartupError::MissingArtifact {
            dir: dir.to_path_buf(),
        })?;

        let feature_names = load_feature_names(dir)?;
        if let Some(names) = &feature_names {
            check_feature_names(names)?;
        }
        let policy = load_policy(dir)?;

        let body = read_text(&model_path)?;
        let spec: ModelSpec = parse_json(&model_path, &body)?;
        let model = ChurnModel::new(spec, FEATURE_COUNT, policy.threshold)?;

        if feature_names.is_none() {
            tracing::warn!(
                model_dir = %dir.display(),
                "no feature_names.json / features.txt; column order is assumed, not verified"
            );
        }

        tracing::info!(
            model = %model_path.display(),
            threshold = policy.threshold,
            "churn model loaded"
        );

        Ok(Self {
            model_path,
            policy,
            schema_checked: feature_names.is_some(),
            model,
        })
    }
}
