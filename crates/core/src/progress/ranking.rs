use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::progress::ProgressError;

/// How many protocols a ranking returns unless told otherwise.
pub const DEFAULT_RANK_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankDirection {
    /// Most completions first; protocols without any are left out.
    Top,
    /// Only protocols with no completion in the window.
    Attention,
}

impl fmt::Display for RankDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankDirection::Top => f.write_str("top"),
            RankDirection::Attention => f.write_str("attention"),
        }
    }
}

impl FromStr for RankDirection {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(RankDirection::Top),
            "attention" | "needs-attention" => Ok(RankDirection::Attention),
            _ => Err(ProgressError::InvalidDirection(s.to_string())),
        }
    }
}

/// Summary row for a ranking: never the full protocol record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProtocol {
    pub title: String,
    pub completion_count: u32,
}

pub(crate) fn rank<'a>(
    counted: impl IntoIterator<Item = (&'a str, u32)>,
    direction: RankDirection,
    limit: usize,
) -> Vec<RankedProtocol> {
    let mut rows: Vec<RankedProtocol> = counted
        .into_iter()
        .filter(|(_, count)| match direction {
            RankDirection::Top => *count > 0,
            RankDirection::Attention => *count == 0,
        })
        .map(|(title, completion_count)| RankedProtocol {
            title: title.to_owned(),
            completion_count,
        })
        .collect();

    // `sort_by` is stable, so ties keep input order.
    match direction {
        RankDirection::Top => rows.sort_by(|a, b| b.completion_count.cmp(&a.completion_count)),
        RankDirection::Attention => {
            rows.sort_by(|a, b| a.completion_count.cmp(&b.completion_count));
        }
    }
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(rows: &[RankedProtocol]) -> Vec<&str> {
        rows.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn top_sorts_descending_with_stable_ties() {
        let rows = rank(
            [("A", 2), ("B", 5), ("C", 2), ("D", 0), ("E", 1)],
            RankDirection::Top,
            DEFAULT_RANK_LIMIT,
        );
        assert_eq!(titles(&rows), vec!["B", "A", "C"]);
    }

    #[test]
    fn attention_keeps_only_untouched_protocols() {
        let rows = rank(
            [("A", 2), ("B", 0), ("C", 0), ("D", 0), ("E", 0)],
            RankDirection::Attention,
            3,
        );
        assert_eq!(titles(&rows), vec!["B", "C", "D"]);
        assert!(rows.iter().all(|r| r.completion_count == 0));
    }

    #[test]
    fn zero_limit_returns_nothing() {
        assert!(rank([("A", 1)], RankDirection::Top, 0).is_empty());
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("TOP".parse::<RankDirection>().unwrap(), RankDirection::Top);
        assert_eq!(
            "needs-attention".parse::<RankDirection>().unwrap(),
            RankDirection::Attention
        );
        assert!("bottom".parse::<RankDirection>().is_err());
    }
}
