//! Business-rule segmentation of RFM scores.
//!
//! Rules are evaluated top to bottom and the first match wins; a customer
//! that satisfies no rule is `Mainstream`. The order is a business decision
//! (several rules overlap), so it lives in one table: [`SEGMENT_RULES`].

use serde::{Deserialize, Serialize};

use crate::rfm::scoring::{RfmScores, ScoredCustomer};

/// Customer segment labels, declared in rule priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    Loyal,
    #[serde(rename = "Growth Potential")]
    GrowthPotential,
    #[serde(rename = "At Risk")]
    AtRisk,
    Dormant,
    Mainstream,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Vip,
        Segment::Loyal,
        Segment::GrowthPotential,
        Segment::AtRisk,
        Segment::Dormant,
        Segment::Mainstream,
    ];
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Vip => write!(f, "VIP"),
            Segment::Loyal => write!(f, "Loyal"),
            Segment::GrowthPotential => write!(f, "Growth Potential"),
            Segment::AtRisk => write!(f, "At Risk"),
            Segment::Dormant => write!(f, "Dormant"),
            Segment::Mainstream => write!(f, "Mainstream"),
        }
    }
}

/// A (predicate, label) pair in the segmentation table.
#[derive(Clone, Copy)]
pub struct SegmentRule {
    pub segment: Segment,
    pub predicate: fn(&RfmScores) -> bool,
}

impl std::fmt::Debug for SegmentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentRule")
            .field("segment", &self.segment)
            .finish_non_exhaustive()
    }
}

/// Recent, frequent, high-spending.
pub fn is_vip(s: &RfmScores) -> bool {
    s.r_score >= 4 && s.f_score >= 4 && s.m_score >= 4
}

pub fn is_loyal(s: &RfmScores) -> bool {
    s.f_score >= 4 && s.m_score >= 3 && s.r_score >= 2
}

/// Recent but low frequency and spend.
pub fn is_growth_potential(s: &RfmScores) -> bool {
    s.r_score >= 4 && s.f_score <= 2 && s.m_score <= 2
}

/// Used to buy often, has not bought lately.
pub fn is_at_risk(s: &RfmScores) -> bool {
    s.r_score <= 2 && s.f_score >= 3 && s.m_score >= 2
}

pub fn is_dormant(s: &RfmScores) -> bool {
    s.r_score <= 1
}

/// Ordered rules. Mainstream is the fallback and has no entry.
pub const SEGMENT_RULES: &[SegmentRule] = &[
    SegmentRule {
        segment: Segment::Vip,
        predicate: is_vip,
    },
    SegmentRule {
        segment: Segment::Loyal,
        predicate: is_loyal,
    },
    SegmentRule {
        segment: Segment::GrowthPotential,
        predicate: is_growth_potential,
    },
    SegmentRule {
        segment: Segment::AtRisk,
        predicate: is_at_risk,
    },
    SegmentRule {
        segment: Segment::Dormant,
        predicate: is_dormant,
    },
];

/// First matching segment for a score triple.
pub fn assign_segment(scores: &RfmScores) -> Segment {
    SEGMENT_RULES
        .iter()
        .find(|rule| (rule.predicate)(scores))
        .map(|rule| rule.segment)
        .unwrap_or(Segment::Mainstream)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedCustomer {
    #[serde(flatten)]
    pub scored: ScoredCustomer,
    pub segment: Segment,
}

/// Attach a segment to every scored customer, preserving order.
pub fn segment_customers(scored: Vec<ScoredCustomer>) -> Vec<SegmentedCustomer> {
    scored
        .into_iter()
        .map(|sc| SegmentedCustomer {
            segment: assign_segment(&sc.scores),
            scored: sc,
        })
        .collect()
}
