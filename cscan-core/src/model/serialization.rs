//! Null-model persistence.
//!
//! The model is written as pretty-printed JSON (`null_model.json`) next to
//! the scan results, for inspection alongside them.

use std::path::Path;

use anyhow::{Context, Result};

use super::null_model::NullModel;

pub fn save_model_json(model: &NullModel, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write null model: {}", path.display()))?;
    Ok(())
}

/// Summary of a null model (for display).
pub fn model_summary(model: &NullModel) -> String {
    let mut out = format!(
        "Gaussian null model v{}\n\
         Samples: {}\n\
         Terms: {}\n\
         Residual variance: {:.6} on {} df",
        model.version,
        model.n_samples,
        model.terms.join(" + "),
        model.sigma2,
        model.df_resid,
    );
    for fe in &model.fixed_effects {
        out.push_str(&format!(
            "\n  {:<12} {:>12.6} {:>12.6} {:>9.3} {:>11.4e}",
            fe.name, fe.estimate, fe.se, fe.t_stat, fe.pvalue
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::null_model::{design_with_intercept, fit_null_model};

    fn small_model() -> NullModel {
        let b = vec![0.0, 1.0, 0.0, 1.0, 1.0];
        let (x, terms) = design_with_intercept(&[("covar", b.as_slice())]);
        let ids = (1..=5).map(|i| format!("S{}", i)).collect();
        fit_null_model(ids, vec![140.0, 155.0, 120.0, 170.0, 161.0], &x, terms).unwrap()
    }

    #[test]
    fn test_saved_json_carries_the_fit() {
        let model = small_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("null_model.json");

        save_model_json(&model, &path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(json["version"], NullModel::VERSION);
        assert_eq!(json["n_samples"], 5);
        assert_eq!(json["sample_ids"][4], "S5");
        assert_eq!(json["terms"][1], "covar");
        assert_eq!(json["residuals"].as_array().unwrap().len(), 5);
        let sigma2 = json["sigma2"].as_f64().unwrap();
        assert!((sigma2 - model.sigma2).abs() < 1e-9 * model.sigma2);
        let covar = &json["fixed_effects"][1];
        assert_eq!(covar["name"], "covar");
        assert!((covar["estimate"].as_f64().unwrap() - model.fixed_effects[1].estimate).abs() < 1e-9);
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("null_model.json");
        let err = save_model_json(&small_model(), &path).unwrap_err();
        assert!(err.to_string().contains("Failed to write null model"));
    }

    #[test]
    fn test_summary_lists_terms() {
        let summary = model_summary(&small_model());
        assert!(summary.contains("(Intercept) + covar"));
        assert!(summary.contains("Samples: 5"));
    }
}
