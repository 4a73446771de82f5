//! Named request shapes and the joins each one recommends.

use std::fmt;
use std::str::FromStr;

use super::joins::JoinName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternName {
    PrivatePlacements,
    Buybacks,
    MaTransactions,
    IndustryCountryAnalysis,
}

/// Expected value of one filter for a pattern to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any present value.
    Any,
    /// Exact string match.
    Exact(&'static str),
}

impl Expect {
    pub fn matches(self, value: &str) -> bool {
        match self {
            Expect::Any => true,
            Expect::Exact(expected) => value == expected,
        }
    }
}

impl PatternName {
    /// Catalog order; detection returns the first match.
    pub const ALL: [PatternName; 4] = [
        PatternName::PrivatePlacements,
        PatternName::Buybacks,
        PatternName::MaTransactions,
        PatternName::IndustryCountryAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternName::PrivatePlacements => "private_placements",
            PatternName::Buybacks => "buybacks",
            PatternName::MaTransactions => "ma_transactions",
            PatternName::IndustryCountryAnalysis => "industry_country_analysis",
        }
    }

    pub fn conditions(self) -> &'static [(&'static str, Expect)] {
        match self {
            PatternName::PrivatePlacements => &[("type", Expect::Exact("1"))],
            PatternName::Buybacks => &[("type", Expect::Exact("14"))],
            PatternName::MaTransactions => &[("type", Expect::Exact("2"))],
            PatternName::IndustryCountryAnalysis => {
                &[("industry", Expect::Any), ("country", Expect::Any)]
            }
        }
    }

    pub fn recommended_joins(self) -> &'static [JoinName] {
        use JoinName::*;
        match self {
            PatternName::PrivatePlacements => &[TransactionType, Company],
            PatternName::Buybacks => &[TransactionType, Company],
            PatternName::MaTransactions => &[
                TransactionType,
                Target,
                TransactionCompanyRel,
                CompRelType,
                Acquirer,
            ],
            PatternName::IndustryCountryAnalysis => &[Company, Industry, Country],
        }
    }

    /// Shape implied by a well-known transaction type id.
    pub fn for_transaction_type(type_id: i64) -> Option<PatternName> {
        match type_id {
            1 => Some(PatternName::PrivatePlacements),
            2 => Some(PatternName::MaTransactions),
            14 => Some(PatternName::Buybacks),
            _ => None,
        }
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown pattern {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse() {
        for pattern in PatternName::ALL {
            assert_eq!(pattern.as_str().parse::<PatternName>(), Ok(pattern));
        }
        assert!("spinoffs".parse::<PatternName>().is_err());
    }

    #[test]
    fn wildcard_matches_any_value() {
        assert!(Expect::Any.matches("32,34"));
        assert!(Expect::Exact("2").matches("2"));
        assert!(!Expect::Exact("2").matches("02"));
    }

    #[test]
    fn well_known_types_imply_shapes() {
        assert_eq!(
            PatternName::for_transaction_type(2),
            Some(PatternName::MaTransactions)
        );
        assert_eq!(PatternName::for_transaction_type(3), None);
    }
}
