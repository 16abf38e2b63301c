//! Categorical verdict domains and their numeric scores.
//!
//! Parsing text into these enums never fails: anything outside a domain lands
//! in `Unmapped`, and every variant has a score.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Error,
    Unmapped,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Error => "error",
            Sentiment::Unmapped => "unmapped",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            "error" => Sentiment::Error,
            _ => Sentiment::Unmapped,
        }
    }

    pub fn score(self) -> i32 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Negative => -1,
            Sentiment::Neutral | Sentiment::Error | Sentiment::Unmapped => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Bug,
    FeatureRequest,
    Documentation,
    Question,
    Other,
    Unknown,
    Unmapped,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Bug => "bug",
            Category::FeatureRequest => "feature_request",
            Category::Documentation => "documentation",
            Category::Question => "question",
            Category::Other => "other",
            Category::Unknown => "unknown",
            Category::Unmapped => "unmapped",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "bug" => Category::Bug,
            "feature_request" => Category::FeatureRequest,
            "documentation" => Category::Documentation,
            "question" => Category::Question,
            "other" => Category::Other,
            "unknown" => Category::Unknown,
            _ => Category::Unmapped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
    High,
    Medium,
    Low,
    Unknown,
    Unmapped,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
            Urgency::Unknown => "unknown",
            Urgency::Unmapped => "unmapped",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "high" => Urgency::High,
            "medium" => Urgency::Medium,
            "low" => Urgency::Low,
            "unknown" => Urgency::Unknown,
            _ => Urgency::Unmapped,
        }
    }

    pub fn score(self) -> i32 {
        match self {
            Urgency::High => 3,
            Urgency::Medium => 2,
            Urgency::Low | Urgency::Unknown | Urgency::Unmapped => 1,
        }
    }
}

/// `sentiment_score * urgency_score`, always within `[-3, 3]`.
pub fn pain_index(sentiment: Sentiment, urgency: Urgency) -> i32 {
    sentiment.score() * urgency.score()
}

/// A verdict from the classification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub category: Category,
    pub urgency: Urgency,
}

impl Classification {
    /// Substituted for any row the service could not classify.
    pub fn sentinel() -> Self {
        Self {
            sentiment: Sentiment::Error,
            category: Category::Unknown,
            urgency: Urgency::Unknown,
        }
    }
}

/// Wire shape the service is instructed to return.
#[derive(Debug, Deserialize)]
struct ClassificationReply {
    sentiment: String,
    category: String,
    urgency: String,
}

/// Parse a service reply. Missing keys and values outside the service's
/// domains are rejected; the sentinel values themselves are not valid replies.
pub fn parse_reply(raw: &str) -> anyhow::Result<Classification> {
    let reply: ClassificationReply = serde_json::from_str(raw.trim())?;

    let sentiment = match Sentiment::from_label(&reply.sentiment) {
        s @ (Sentiment::Positive | Sentiment::Neutral | Sentiment::Negative) => s,
        _ => anyhow::bail!("sentiment out of domain: {:?}", reply.sentiment),
    };
    let category = match Category::from_label(&reply.category) {
        Category::Unknown | Category::Unmapped => {
            anyhow::bail!("category out of domain: {:?}", reply.category)
        }
        c => c,
    };
    let urgency = match Urgency::from_label(&reply.urgency) {
        u @ (Urgency::High | Urgency::Medium | Urgency::Low) => u,
        _ => anyhow::bail!("urgency out of domain: {:?}", reply.urgency),
    };

    Ok(Classification {
        sentiment,
        category,
        urgency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTIMENTS: [Sentiment; 5] = [
        Sentiment::Positive,
        Sentiment::Neutral,
        Sentiment::Negative,
        Sentiment::Error,
        Sentiment::Unmapped,
    ];
    const URGENCIES: [Urgency; 5] = [
        Urgency::High,
        Urgency::Medium,
        Urgency::Low,
        Urgency::Unknown,
        Urgency::Unmapped,
    ];

    #[test]
    fn test_pain_index_bounds() {
        for s in SENTIMENTS {
            for u in URGENCIES {
                let pain = pain_index(s, u);
                assert!((-3..=3).contains(&pain), "{:?} x {:?} = {}", s, u, pain);
            }
        }
        assert_eq!(pain_index(Sentiment::Negative, Urgency::High), -3);
        assert_eq!(pain_index(Sentiment::Positive, Urgency::High), 3);
    }

    #[test]
    fn test_pain_index_zero_when_neutral_or_unmapped() {
        for u in URGENCIES {
            assert_eq!(pain_index(Sentiment::Neutral, u), 0);
            assert_eq!(pain_index(Sentiment::Unmapped, u), 0);
            assert_eq!(pain_index(Sentiment::Error, u), 0);
        }
    }

    #[test]
    fn test_unmapped_defaults() {
        assert_eq!(Sentiment::from_label("furious"), Sentiment::Unmapped);
        assert_eq!(Sentiment::from_label("").score(), 0);
        assert_eq!(Urgency::from_label("").score(), 1);
        assert_eq!(Urgency::from_label("unknown").score(), 1);
        assert_eq!(Category::from_label("chore"), Category::Unmapped);
    }

    #[test]
    fn test_parse_reply() {
        let verdict =
            parse_reply(r#"{"sentiment":"negative","category":"bug","urgency":"high"}"#).unwrap();
        assert_eq!(verdict.sentiment, Sentiment::Negative);
        assert_eq!(verdict.category, Category::Bug);
        assert_eq!(verdict.urgency, Urgency::High);
    }

    #[test]
    fn test_parse_reply_rejects_out_of_domain() {
        assert!(parse_reply(r#"{"sentiment":"angry","category":"bug","urgency":"high"}"#).is_err());
        assert!(parse_reply(r#"{"sentiment":"neutral","category":"bug"}"#).is_err());
        assert!(parse_reply("not json").is_err());
    }

    #[test]
    fn test_sentinel_strings() {
        let s = Classification::sentinel();
        assert_eq!(s.sentiment.as_str(), "error");
        assert_eq!(s.category.as_str(), "unknown");
        assert_eq!(s.urgency.as_str(), "unknown");
    }
}
