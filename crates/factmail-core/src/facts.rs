use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of facts a single digest asks the model for.
pub const FACTS_PER_DIGEST: usize = 10;

/// Topic label attached to every fact.
///
/// The five named variants are the categories the prompt asks for. Anything
/// else the model returns is preserved verbatim in `Other` so that a stray
/// label degrades to a coverage warning instead of a parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FactCategory {
    TaxAndLlc,
    RealEstate,
    InvestingAndWealth,
    ParentingAndFamily,
    HealthAndWellness,
    Other(String),
}

impl FactCategory {
    /// The recognised categories, in prompt order.
    pub const ALL: [FactCategory; 5] = [
        FactCategory::TaxAndLlc,
        FactCategory::RealEstate,
        FactCategory::InvestingAndWealth,
        FactCategory::ParentingAndFamily,
        FactCategory::HealthAndWellness,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::TaxAndLlc => "Tax & LLC Strategy",
            Self::RealEstate => "Real Estate Investing",
            Self::InvestingAndWealth => "Investing & Wealth",
            Self::ParentingAndFamily => "Parenting & Family",
            Self::HealthAndWellness => "Health & Wellness",
            Self::Other(label) => label,
        }
    }

    /// Topics the prompt lists after the label. Empty for `Other`.
    pub fn description(&self) -> &'static str {
        match self {
            Self::TaxAndLlc => {
                "Tax optimization, LLC structures, asset protection, business deductions"
            }
            Self::RealEstate => {
                "Commercial/residential investing, 1031 exchanges, market trends, REITs"
            }
            Self::InvestingAndWealth => {
                "Angel investing, 401Ks, IRAs, portfolio allocation, robo-advisors, valuation"
            }
            Self::ParentingAndFamily => {
                "Raising kids, child development, work-life balance, family happiness, financial planning for children"
            }
            Self::HealthAndWellness => {
                "Longevity strategies, fitness optimization, mental health, sleep, biohacking"
            }
            Self::Other(_) => "",
        }
    }

    pub fn is_recognised(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FactCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let known = Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed));
        Ok(known.unwrap_or_else(|| Self::Other(trimmed.to_string())))
    }
}

impl From<String> for FactCategory {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(c) => c,
            Err(never) => match never {},
        }
    }
}

impl From<FactCategory> for String {
    fn from(c: FactCategory) -> Self {
        c.label().to_string()
    }
}

/// One category-labelled statement produced by a generation call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub category: FactCategory,
    #[serde(rename = "fact")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Fact {
    pub fn new(category: FactCategory, text: impl Into<String>, source: Option<String>) -> Self {
        Self {
            category,
            text: text.into(),
            source: source.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Append-only log entry recording that a fact went out in a digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentFactRecord {
    pub fact: String,
    pub category: FactCategory,
    #[serde(default)]
    pub source: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl SentFactRecord {
    pub fn from_fact(fact: &Fact, sent_at: DateTime<Utc>) -> Self {
        Self {
            fact: fact.text.clone(),
            category: fact.category.clone(),
            source: fact.source.clone(),
            sent_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
}
