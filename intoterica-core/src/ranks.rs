//! Rank tables: the ordered XP ladder inside one faction.
//!
//! Older worlds stored a faction's ranks as bare names. Newer ones store
//! full [`Rank`] records. Both shapes are resolved once, at decode time,
//! by [`RankList::normalize`]; everything downstream works on canonical
//! `Vec<Rank>` only.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::coerce::{self, coerce_modifier, coerce_xp};

/// A named step in a faction's internal hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    /// Display label.
    pub name: String,
    /// Minimum accumulated XP required to hold this rank.
    #[serde(default, deserialize_with = "coerce::lenient_u64")]
    pub xp: u64,
    /// Reputation weight of members holding this rank.
    #[serde(
        default = "coerce::default_modifier",
        deserialize_with = "coerce::lenient_modifier"
    )]
    pub modifier: f64,
    /// Optional flavour text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Returned by [`rank_at`] for indexes outside the rank table.
pub static DEFAULT_RANK: Rank = Rank {
    name: String::new(),
    xp: 0,
    modifier: 1.0,
    description: None,
};

impl Rank {
    /// Create a rank with the given name, XP threshold and modifier.
    #[must_use]
    pub fn new(name: impl Into<String>, xp: u64, modifier: f64) -> Self {
        Self {
            name: name.into(),
            xp,
            modifier,
            description: None,
        }
    }

    /// Legacy conversion: a bare name becomes `{name, xp: 0, modifier: 1.0}`.
    #[must_use]
    pub fn from_legacy(name: impl Into<String>) -> Self {
        Self::new(name, 0, 1.0)
    }

    /// Weight this rank contributes to the faction aggregate.
    ///
    /// Zero and non-finite modifiers count as `1.0`.
    #[must_use]
    pub fn weight(&self) -> f64 {
        coerce::sanitize_modifier(self.modifier)
    }
}

/// Raw shape of a stored rank table, before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RankList {
    /// Bare rank names from older worlds.
    Legacy(Vec<String>),
    /// Full rank records.
    Canonical(Vec<Rank>),
    /// Anything else; the first element decides how the rest is read.
    Mixed(Vec<Value>),
}

impl RankList {
    /// Resolve the stored shape into canonical ranks.
    ///
    /// Legacy names map to `{name, xp: 0, modifier: 1.0}`; canonical
    /// records pass through unchanged. An empty table stays empty.
    #[must_use]
    pub fn normalize(self) -> Vec<Rank> {
        match self {
            Self::Legacy(names) => names.into_iter().map(Rank::from_legacy).collect(),
            Self::Canonical(ranks) => ranks,
            Self::Mixed(values) => normalize_mixed(values),
        }
    }
}

fn normalize_mixed(values: Vec<Value>) -> Vec<Rank> {
    let legacy = values.first().is_some_and(Value::is_string);
    values
        .into_iter()
        .filter_map(|value| {
            if legacy {
                let name = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                return Some(Rank::from_legacy(name));
            }
            match serde_json::from_value::<Rank>(value) {
                Ok(rank) => Some(rank),
                Err(e) => {
                    warn!(error = %e, "Dropping unreadable rank entry");
                    None
                }
            }
        })
        .collect()
}

impl Default for RankList {
    fn default() -> Self {
        Self::Canonical(Vec::new())
    }
}

/// Serde helper: decode either rank shape straight into canonical ranks.
pub(crate) fn deserialize_ranks<'de, D>(deserializer: D) -> Result<Vec<Rank>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = Option::<RankList>::deserialize(deserializer)?;
    Ok(list.unwrap_or_default().normalize())
}

/// Rank input from an editing surface: either a table or `name, xp, modifier` lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum RankInput {
    Lines(String),
    Table(RankList),
}

/// Serde helper for edit payloads: accept the textual form as well as
/// either stored shape.
pub(crate) fn deserialize_rank_input<'de, D>(deserializer: D) -> Result<Vec<Rank>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RankInput>::deserialize(deserializer)? {
        Some(RankInput::Lines(text)) => parse_rank_lines(&text),
        Some(RankInput::Table(list)) => list.normalize(),
        None => Vec::new(),
    })
}

/// Total lookup into a rank table.
///
/// Out-of-range indexes yield [`DEFAULT_RANK`] instead of panicking.
#[must_use]
pub fn rank_at(ranks: &[Rank], index: usize) -> &Rank {
    ranks.get(index).unwrap_or(&DEFAULT_RANK)
}

/// Parse the textual rank form: one `name, xp, modifier` entry per line.
///
/// Blank lines and lines without a name are skipped. Missing or malformed
/// XP becomes `0`; a missing or malformed modifier becomes `1.0`.
#[must_use]
pub fn parse_rank_lines(text: &str) -> Vec<Rank> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().filter(|n| !n.is_empty())?;
            let xp = fields.next().map_or(0, coerce_xp);
            let modifier = fields.next().map_or(1.0, coerce_modifier);
            Some(Rank::new(name, xp, modifier))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_names_are_normalized() {
        let list: RankList = serde_json::from_str(r#"["Recruit","Veteran"]"#).expect("parse");
        let ranks = list.normalize();
        assert_eq!(
            ranks,
            vec![Rank::new("Recruit", 0, 1.0), Rank::new("Veteran", 0, 1.0)]
        );
    }

    #[test]
    fn canonical_ranks_pass_through() {
        let list: RankList = serde_json::from_str(
            r#"[{"name":"Initiate","xp":0,"modifier":1.0},{"name":"Warden","xp":250,"modifier":2.5}]"#,
        )
        .expect("parse");
        let ranks = list.normalize();
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks[1].xp, 250);
        assert!((ranks[1].modifier - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn leading_string_forces_legacy_reading() {
        let list: RankList =
            serde_json::from_str(r#"["Recruit", {"name":"Odd"}, 7]"#).expect("parse");
        let ranks = list.normalize();
        assert_eq!(ranks.len(), 3);
        assert!(ranks.iter().all(|r| r.xp == 0));
        assert_eq!(ranks[2].name, "7");
    }

    #[test]
    fn unreadable_canonical_entries_are_dropped() {
        let list: RankList =
            serde_json::from_str(r#"[{"name":"Keeper","xp":5}, "stray", {"xp":1}]"#).expect("parse");
        let ranks = list.normalize();
        assert_eq!(ranks, vec![Rank::new("Keeper", 5, 1.0)]);
    }

    #[test]
    fn empty_table_is_empty() {
        let list: RankList = serde_json::from_str("[]").expect("parse");
        assert!(list.normalize().is_empty());
        assert!(RankList::default().normalize().is_empty());
    }

    #[test]
    fn rank_at_is_total() {
        let ranks = vec![Rank::new("Only", 10, 3.0)];
        assert_eq!(rank_at(&ranks, 0).name, "Only");
        assert_eq!(rank_at(&ranks, 7), &DEFAULT_RANK);
        assert_eq!(rank_at(&[], 0), &DEFAULT_RANK);
    }

    #[test]
    fn zero_modifier_weighs_one() {
        assert!((Rank::new("Ghost", 0, 0.0).weight() - 1.0).abs() < f64::EPSILON);
        assert!((Rank::new("Heavy", 0, 2.0).weight() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rank_lines_parse_with_defaults() {
        let ranks = parse_rank_lines("Initiate, 0, 1.0\n\nAdept, 100\nMaster, abc, x\n , 5, 2");
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[1], Rank::new("Adept", 100, 1.0));
        assert_eq!(ranks[2], Rank::new("Master", 0, 1.0));
    }
}
