#![doc = r#"
pkm-relevance — a deterministic, policy-free scorer mapping a document and a
reference instant to a number in `[0, 1]`. No artificial floor is applied
here; an archival policy that wants to compare against a threshold does so
with the raw value this crate returns.
"#]

use chrono::{DateTime, Utc};
use pkm_core::DocumentRecord;

const LINKS_LOG_BASE: f64 = 101.0;
const MEDIA_SCORE_PLACEHOLDER: f64 = 0.5;
const QUALITY_WORDS_CEILING: f64 = 2000.0;

#[derive(Debug, thiserror::Error)]
pub enum WeightsError {
    #[error("relevance weights must be non-negative, got {0:?}")]
    Negative((f64, f64, f64, f64)),
    #[error("relevance weights must sum to 1.0, got {0}")]
    DoesNotSumToOne(f64),
}

/// `recency + links + quality + user` must sum to 1.0; validated once at
/// construction rather than silently renormalized, so a misconfigured weight
/// set surfaces immediately as a configuration error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub recency: f64,
    pub links: f64,
    pub quality: f64,
    pub user: f64,
}

impl RelevanceWeights {
    pub fn new(recency: f64, links: f64, quality: f64, user: f64) -> Result<Self, WeightsError> {
        if recency < 0.0 || links < 0.0 || quality < 0.0 || user < 0.0 {
            return Err(WeightsError::Negative((recency, links, quality, user)));
        }
        let sum = recency + links + quality + user;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(WeightsError::DoesNotSumToOne(sum));
        }
        Ok(RelevanceWeights {
            recency,
            links,
            quality,
            user,
        })
    }
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        RelevanceWeights {
            recency: 0.4,
            links: 0.3,
            quality: 0.2,
            user: 0.1,
        }
    }
}

/// `score = w_recency*R + w_links*L + w_quality*Q + w_user*U`, deterministic
/// in `(doc, now, weights, half_life_days)`. Half-life defaults to 90 days
/// at the caller's configuration layer, not inside this pure function.
pub fn score(doc: &DocumentRecord, now: DateTime<Utc>, weights: &RelevanceWeights, half_life_days: f64) -> f64 {
    let r = recency(doc, now, half_life_days);
    let l = links(doc);
    let q = quality(doc);
    let u = user(doc);

    weights.recency * r + weights.links * l + weights.quality * q + weights.user * u
}

fn recency(doc: &DocumentRecord, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let age_days = (now - doc.updated).num_seconds() as f64 / 86_400.0;
    if half_life_days <= 0.0 {
        return if age_days <= 0.0 { 1.0 } else { 0.0 };
    }
    (-age_days / half_life_days).exp().clamp(0.0, 1.0)
}

fn links(doc: &DocumentRecord) -> f64 {
    let backlinks = doc.backlinks.len() as f64;
    ((1.0 + backlinks).ln() / (1.0 + (LINKS_LOG_BASE - 1.0)).ln()).clamp(0.0, 1.0)
}

fn quality(doc: &DocumentRecord) -> f64 {
    let word_component = 0.5 * (doc.word_count as f64 / QUALITY_WORDS_CEILING).min(1.0);
    let outgoing_component = if doc.links.is_empty() { 0.0 } else { 0.3 };
    word_component + outgoing_component + 0.2 * MEDIA_SCORE_PLACEHOLDER
}

fn user(doc: &DocumentRecord) -> f64 {
    let mut total = 0.0;
    if doc.status.human_edited {
        total += 0.5;
    }
    if doc.status.agent_reviewed {
        total += 0.3;
    }
    total
}
