use std::str::FromStr;

use crate::error::BuildError;

/// Aggregate applied by the `measure` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    CountDistinct,
}

/// Field measured when the request names none.
pub(crate) const DEFAULT_MEASURE_FIELD: &str = "size";

/// `field` value that makes `measure=count` count transactions.
const TRANSACTIONS: &str = "transactions";

impl Measure {
    /// Aggregate expression over an already resolved column.
    pub fn apply(self, column: &str) -> String {
        match self {
            Measure::Count => format!("COUNT({column})"),
            Measure::Sum => format!("SUM({column})"),
            Measure::Avg => format!("AVG({column})"),
            Measure::Min => format!("MIN({column})"),
            Measure::Max => format!("MAX({column})"),
            Measure::CountDistinct => format!("COUNT(DISTINCT {column})"),
        }
    }

    /// Aggregate for a logical `field`; `count` over `transactions` counts
    /// base rows by `id_column`.
    pub(crate) fn over_field(
        self,
        field: &str,
        resolve: impl Fn(&str) -> String,
        id_column: &str,
    ) -> String {
        if self == Measure::Count && field == TRANSACTIONS {
            return Measure::Count.apply(id_column);
        }
        self.apply(&resolve(field))
    }
}

impl FromStr for Measure {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Measure::Count),
            "sum" => Ok(Measure::Sum),
            "avg" => Ok(Measure::Avg),
            "min" => Ok(Measure::Min),
            "max" => Ok(Measure::Max),
            "countdistinct" | "count_distinct" => Ok(Measure::CountDistinct),
            _ => Err(BuildError::UnknownMeasure(s.to_string())),
        }
    }
}
