//! Score normalization and severity classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder shown when a window has no usable score.
pub const PLACEHOLDER_SCORE: &str = "--";

const INAUSPICIOUS_KEYWORDS: &[&str] = &[
    "inauspicious",
    "avoid",
    "unfavourable",
    "unfavorable",
    "bad",
    "malefic",
    "caution",
    "negative",
];

const AUSPICIOUS_KEYWORDS: &[&str] = &[
    "auspicious",
    "favourable",
    "favorable",
    "good",
    "benefic",
    "positive",
];

const NEUTRAL_KEYWORDS: &[&str] = &["neutral", "mixed", "challenging", "moderate"];

/// Three-valued quality classification of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Auspicious,
    Inauspicious,
    #[default]
    Neutral,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Auspicious => "auspicious",
            Severity::Inauspicious => "inauspicious",
            Severity::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display variant derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreVariant {
    Good,
    #[default]
    Neutral,
    Bad,
}

impl ScoreVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreVariant::Good => "good",
            ScoreVariant::Neutral => "neutral",
            ScoreVariant::Bad => "bad",
        }
    }
}

impl fmt::Display for ScoreVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerces a raw score to a finite number clamped to `[0, 10]`.
///
/// Numbers and numeric strings are accepted; anything else is `None`.
///
/// ```
/// use muhurta::severity::normalize_score;
/// use serde_json::json;
///
/// assert_eq!(normalize_score(&json!(-5)), Some(0.0));
/// assert_eq!(normalize_score(&json!("7.5")), Some(7.5));
/// assert_eq!(normalize_score(&json!("n/a")), None);
/// ```
pub fn normalize_score(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(0.0, 10.0))
}

/// Maps a normalized score to its display variant.
pub fn score_variant(score: Option<f64>) -> ScoreVariant {
    match score {
        Some(s) if s.is_nan() => ScoreVariant::Neutral,
        Some(s) if s >= 7.0 => ScoreVariant::Good,
        Some(s) if s >= 4.0 => ScoreVariant::Neutral,
        Some(_) => ScoreVariant::Bad,
        None => ScoreVariant::Neutral,
    }
}

/// Renders a score for display: whole numbers without decimals, others with one.
pub fn score_text(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() && s.fract() == 0.0 => format!("{:.0}", s),
        Some(s) if s.is_finite() => format!("{:.1}", s),
        _ => PLACEHOLDER_SCORE.to_string(),
    }
}

/// Matches free text against the severity keyword families.
///
/// Inauspicious terms are checked first since they contain the auspicious
/// ones as substrings ("inauspicious", "unfavourable").
pub fn severity_from_text(text: &str) -> Option<Severity> {
    let lower = text.to_lowercase();
    if lower.trim().is_empty() {
        return None;
    }
    let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if contains_any(INAUSPICIOUS_KEYWORDS) {
        Some(Severity::Inauspicious)
    } else if contains_any(AUSPICIOUS_KEYWORDS) {
        Some(Severity::Auspicious)
    } else if contains_any(NEUTRAL_KEYWORDS) {
        Some(Severity::Neutral)
    } else {
        None
    }
}

/// Classifies a window's severity.
///
/// Priority: explicit severity/impact/status text, then category/type text,
/// then the score, then neutral.
pub fn classify_severity(
    explicit: Option<&str>,
    category: Option<&str>,
    score: Option<f64>,
) -> Severity {
    if let Some(severity) = explicit.and_then(severity_from_text) {
        return severity;
    }
    if let Some(severity) = category.and_then(severity_from_text) {
        return severity;
    }
    match score {
        Some(s) if s >= 7.0 => Severity::Auspicious,
        Some(s) if s <= 3.0 => Severity::Inauspicious,
        _ => Severity::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use serde_json::json;

    #[test]
    fn test_normalize_score_clamps() {
        assert_eq!(normalize_score(&json!(-5)), Some(0.0));
        assert_eq!(normalize_score(&json!(15)), Some(10.0));
        assert_eq!(normalize_score(&json!("7.5")), Some(7.5));
        assert_eq!(normalize_score(&json!(" 3 ")), Some(3.0));
    }

    #[test]
    fn test_normalize_score_rejects_non_numeric() {
        assert_eq!(normalize_score(&json!("high")), None);
        assert_eq!(normalize_score(&json!("")), None);
        assert_eq!(normalize_score(&json!("NaN")), None);
        assert_eq!(normalize_score(&json!("inf")), None);
        assert_eq!(normalize_score(&json!(null)), None);
        assert_eq!(normalize_score(&json!(true)), None);
        assert_eq!(normalize_score(&json!([7])), None);
    }

    #[test]
    fn test_normalize_score_random_inputs_stay_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let raw: f64 = rng.gen_range(-1.0e6..1.0e6);
            let score = normalize_score(&json!(raw)).unwrap();
            assert!((0.0..=10.0).contains(&score), "{} -> {}", raw, score);

            let as_text = normalize_score(&json!(raw.to_string())).unwrap();
            assert!((0.0..=10.0).contains(&as_text));
        }
    }

    #[test]
    fn test_score_variant_thresholds() {
        assert_eq!(score_variant(None), ScoreVariant::Neutral);
        assert_eq!(score_variant(Some(f64::NAN)), ScoreVariant::Neutral);
        assert_eq!(score_variant(Some(7.0)), ScoreVariant::Good);
        assert_eq!(score_variant(Some(6.9)), ScoreVariant::Neutral);
        assert_eq!(score_variant(Some(4.0)), ScoreVariant::Neutral);
        assert_eq!(score_variant(Some(3.9)), ScoreVariant::Bad);
    }

    #[test]
    fn test_score_text() {
        assert_eq!(score_text(Some(7.0)), "7");
        assert_eq!(score_text(Some(7.5)), "7.5");
        assert_eq!(score_text(Some(2.34)), "2.3");
        assert_eq!(score_text(None), "--");
    }

    #[test]
    fn test_explicit_text_wins() {
        assert_eq!(
            classify_severity(Some("Inauspicious"), Some("good"), Some(9.0)),
            Severity::Inauspicious
        );
        assert_eq!(
            classify_severity(Some("Favourable"), None, Some(1.0)),
            Severity::Auspicious
        );
        assert_eq!(
            classify_severity(Some("challenging"), None, Some(9.0)),
            Severity::Neutral
        );
    }

    #[test]
    fn test_unfavourable_is_not_auspicious() {
        assert_eq!(severity_from_text("Unfavourable"), Some(Severity::Inauspicious));
        assert_eq!(severity_from_text("UNFAVORABLE"), Some(Severity::Inauspicious));
    }

    #[test]
    fn test_category_then_score() {
        assert_eq!(
            classify_severity(Some("Ruling"), Some("Rahu Kalam - avoid"), Some(9.0)),
            Severity::Inauspicious
        );
        assert_eq!(
            classify_severity(None, Some("Abhijit"), Some(8.0)),
            Severity::Auspicious
        );
        assert_eq!(
            classify_severity(None, None, Some(3.0)),
            Severity::Inauspicious
        );
        assert_eq!(classify_severity(None, None, Some(5.0)), Severity::Neutral);
        assert_eq!(classify_severity(None, None, None), Severity::Neutral);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Inauspicious).unwrap(),
            "\"inauspicious\""
        );
        assert_eq!(ScoreVariant::Good.to_string(), "good");
    }
}
