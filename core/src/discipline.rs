//! Role → discipline classification.
//!
//! Roles are free text. Each is matched case-insensitively against an
//! ordered table of title fragments; the first discipline with a matching
//! fragment wins and anything unmatched is `Other`.
//!
//! ORDER IS LOAD-BEARING: management titles such as "Engineering Manager"
//! contain "Engineer", so the delivery and quality rows must be checked
//! before the generic engineering row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Delivery,
    QualityEngineering,
    Product,
    Engineering,
    Other,
}

impl Discipline {
    /// Dev + QE: the people whose time is the capacity denominator.
    pub fn is_delivery_capacity(self) -> bool {
        matches!(self, Self::Engineering | Self::QualityEngineering)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Delivery           => "Delivery",
            Self::QualityEngineering => "QE",
            Self::Product            => "Product",
            Self::Engineering        => "Engineering",
            Self::Other              => "Other",
        }
    }
}

/// Evaluated top to bottom.
const DISCIPLINE_TABLE: &[(Discipline, &[&str])] = &[
    (
        Discipline::Delivery,
        &[
            "delivery lead",
            "delivery manager",
            "manager delivery",
            "engineering manager",
            "head of",
        ],
    ),
    (
        Discipline::QualityEngineering,
        &["quality engineer", "qe/automation", "test engineer", "qa engineer"],
    ),
    (
        Discipline::Product,
        &[
            "product manager",
            "manager product",
            "product design",
            "business analyst",
            "associate ba",
            "design researcher",
        ],
    ),
    (
        Discipline::Engineering,
        &["engineer", "tech lead", "developer"],
    ),
];

pub fn classify(role: &str) -> Discipline {
    let role = role.to_lowercase();
    DISCIPLINE_TABLE
        .iter()
        .find(|(_, fragments)| fragments.iter().any(|f| role.contains(f)))
        .map(|(discipline, _)| *discipline)
        .unwrap_or(Discipline::Other)
}

/// Weighted headcount per discipline for one squad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisciplineCounts {
    pub delivery:            f64,
    pub quality_engineering: f64,
    pub product:             f64,
    pub engineering:         f64,
    pub other:               f64,
}

impl DisciplineCounts {
    pub fn add(&mut self, discipline: Discipline, weight: f64) {
        match discipline {
            Discipline::Delivery           => self.delivery += weight,
            Discipline::QualityEngineering => self.quality_engineering += weight,
            Discipline::Product            => self.product += weight,
            Discipline::Engineering        => self.engineering += weight,
            Discipline::Other              => self.other += weight,
        }
    }

    pub fn delivery_capacity(&self) -> f64 {
        self.engineering + self.quality_engineering
    }

    pub fn total(&self) -> f64 {
        self.delivery + self.quality_engineering + self.product + self.engineering + self.other
    }
}
