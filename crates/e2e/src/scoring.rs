//! Category score extraction from Lighthouse results

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Audited quality category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Performance", alias = "performance")]
    Performance,
    #[serde(rename = "SEO", alias = "seo")]
    Seo,
    #[serde(rename = "Accessibility", alias = "accessibility")]
    Accessibility,
    #[serde(rename = "Best Practices", alias = "best-practices")]
    BestPractices,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Performance,
        Category::Seo,
        Category::Accessibility,
        Category::BestPractices,
    ];

    /// Lighthouse category id
    pub fn id(&self) -> &'static str {
        match self {
            Category::Performance => "performance",
            Category::Seo => "seo",
            Category::Accessibility => "accessibility",
            Category::BestPractices => "best-practices",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Performance => "Performance",
            Category::Seo => "SEO",
            Category::Accessibility => "Accessibility",
            Category::BestPractices => "Best Practices",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What an audit run hands back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub lhr: LighthouseResult,
}

/// The subset of a Lighthouse result (LHR) this crate reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseResult {
    #[serde(default)]
    pub requested_url: Option<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub lighthouse_version: Option<String>,
    #[serde(default)]
    pub runtime_error: Option<RuntimeError>,
    #[serde(default)]
    pub categories: HashMap<String, CategoryResult>,
}

/// Fatal problem Lighthouse reports inside an otherwise well-formed result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    /// Fraction in [0, 1]; null when Lighthouse could not compute it
    pub score: Option<f64>,
}

/// Percentage score per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMap {
    #[serde(rename = "Performance")]
    pub performance: f64,
    #[serde(rename = "SEO")]
    pub seo: f64,
    #[serde(rename = "Accessibility")]
    pub accessibility: f64,
    #[serde(rename = "Best Practices")]
    pub best_practices: f64,
}

impl ScoreMap {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Performance => self.performance,
            Category::Seo => self.seo,
            Category::Accessibility => self.accessibility,
            Category::BestPractices => self.best_practices,
        }
    }

    /// Categories scoring under their configured minimum, with the actual score
    pub fn below(&self, minimums: &BTreeMap<Category, f64>) -> Vec<(Category, f64, f64)> {
        minimums
            .iter()
            .filter_map(|(category, min)| {
                let score = self.get(*category);
                (score < *min).then_some((*category, score, *min))
            })
            .collect()
    }
}

/// Convert the four category fractions of an audit result to percentages.
///
/// Fails if any category is absent or has no score.
pub fn extract_scores(result: &AuditResult) -> E2eResult<ScoreMap> {
    let percent = |category: Category| -> E2eResult<f64> {
        result
            .lhr
            .categories
            .get(category.id())
            .and_then(|c| c.score)
            .map(|fraction| fraction * 100.0)
            .ok_or_else(|| E2eError::AuditCategoryMissing(category.id().to_string()))
    };

    Ok(ScoreMap {
        performance: percent(Category::Performance)?,
        seo: percent(Category::Seo)?,
        accessibility: percent(Category::Accessibility)?,
        best_practices: percent(Category::BestPractices)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_from(json: serde_json::Value) -> AuditResult {
        AuditResult {
            lhr: serde_json::from_value(json).unwrap(),
        }
    }

    fn full_result() -> AuditResult {
        result_from(serde_json::json!({
            "requestedUrl": "https://example.com/",
            "categories": {
                "performance": { "title": "Performance", "score": 0.873 },
                "seo": { "title": "SEO", "score": 1.0 },
                "accessibility": { "title": "Accessibility", "score": 0.5 },
                "best-practices": { "title": "Best Practices", "score": 0.0 }
            }
        }))
    }

    #[test]
    fn test_scores_are_scaled_by_100() {
        let scores = extract_scores(&full_result()).unwrap();
        assert!((scores.performance - 87.3).abs() < 1e-9);
        assert_eq!(scores.seo, 100.0);
        assert_eq!(scores.accessibility, 50.0);
        assert_eq!(scores.best_practices, 0.0);
    }

    #[test]
    fn test_score_map_key_order() {
        let scores = extract_scores(&full_result()).unwrap();
        let json = serde_json::to_string(&scores).unwrap();
        let keys: Vec<usize> = ["\"Performance\"", "\"SEO\"", "\"Accessibility\"", "\"Best Practices\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_category_fails() {
        let result = result_from(serde_json::json!({
            "categories": {
                "performance": { "score": 0.9 },
                "seo": { "score": 0.9 },
                "accessibility": { "score": 0.9 }
            }
        }));
        match extract_scores(&result) {
            Err(E2eError::AuditCategoryMissing(id)) => assert_eq!(id, "best-practices"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_null_score_fails() {
        let mut result = full_result();
        result.lhr.categories.get_mut("seo").unwrap().score = None;
        assert!(matches!(extract_scores(&result), Err(E2eError::AuditCategoryMissing(_))));
    }

    #[test]
    fn test_reads_run_metadata() {
        let result = result_from(serde_json::json!({
            "requestedUrl": "https://example.com",
            "finalUrl": "https://example.com/",
            "lighthouseVersion": "11.4.0",
            "categories": {}
        }));
        assert_eq!(result.lhr.final_url.as_deref(), Some("https://example.com/"));
        assert_eq!(result.lhr.lighthouse_version.as_deref(), Some("11.4.0"));
        assert!(result.lhr.runtime_error.is_none());
    }

    #[test]
    fn test_below_thresholds() {
        let scores = extract_scores(&full_result()).unwrap();
        let mut minimums = BTreeMap::new();
        minimums.insert(Category::Performance, 90.0);
        minimums.insert(Category::Seo, 90.0);

        let below = scores.below(&minimums);
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].0, Category::Performance);
    }
}
