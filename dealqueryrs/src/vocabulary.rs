use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DealQueryError, Result};

/// Read-only domain vocabulary: id -> label tables and named id groups.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Vocabulary {
    pub transaction_types: BTreeMap<i64, String>,
    pub statuses: BTreeMap<i64, String>,
    pub status_groups: BTreeMap<String, Vec<i64>>,
    pub relationship_types: BTreeMap<i64, String>,
    pub advisory_types: BTreeMap<i64, String>,
    pub industries: BTreeMap<i64, String>,
    pub industry_sectors: BTreeMap<String, Vec<i64>>,
}

/// Id columns with a vocabulary label, and the column the label fills.
const LABELLED_COLUMNS: [(&str, &str); 5] = [
    ("transactionIdTypeId", "transactionIdTypeName"),
    ("statusId", "statusName"),
    ("simpleIndustryId", "simpleIndustryDescription"),
    ("transactionToCompRelTypeId", "relationshipType"),
    ("advisorTypeId", "advisorTypeName"),
];

fn labels(entries: &[(i64, &str)]) -> BTreeMap<i64, String> {
    entries.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

fn groups(entries: &[(&str, &[i64])]) -> BTreeMap<String, Vec<i64>> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_vec()))
        .collect()
}

impl Vocabulary {
    pub fn builtin() -> Self {
        Self {
            transaction_types: labels(&[
                (1, "Private Placement"),
                (2, "M&A Transaction"),
                (3, "IPO"),
                (4, "Secondary Offering"),
                (5, "Buyout"),
                (6, "Venture Capital/Private Equity"),
                (7, "Spin-off/Split-off"),
                (14, "Buyback"),
            ]),
            statuses: labels(&[
                (1, "Announced"),
                (2, "Completed"),
                (3, "Pending"),
                (4, "Terminated"),
                (5, "Withdrawn"),
                (6, "Rumored"),
                (7, "Expired"),
                (8, "Pending Regulatory Approval"),
                (9, "Pending Shareholder Approval"),
                (10, "In Progress"),
            ]),
            status_groups: groups(&[
                ("active", &[1, 2, 3, 8, 9, 10]),
                ("completed", &[2]),
                ("terminated", &[4, 5, 7]),
                ("in_progress", &[1, 3, 8, 9, 10]),
            ]),
            relationship_types: labels(&[
                (1, "Acquirer"),
                (2, "Target"),
                (3, "Seller"),
                (4, "Investor"),
                (5, "Advisor"),
            ]),
            advisory_types: labels(&[
                (1, "Financial Advisor"),
                (2, "Legal Advisor"),
                (3, "Lead Manager"),
                (4, "Co-Manager"),
                (5, "Accounting Advisor"),
                (6, "Fairness Opinion Provider"),
                (7, "Technical Advisor"),
                (8, "Strategic Advisor"),
            ]),
            industries: labels(&[
                (1, "Aerospace & Defense"),
                (2, "Automobiles & Components"),
                (3, "Banks"),
                (4, "Capital Goods"),
                (5, "Chemicals"),
                (6, "Commercial Services & Supplies"),
                (7, "Construction & Engineering"),
                (8, "Consumer Durables & Apparel"),
                (9, "Consumer Services"),
                (10, "Diversified Financials"),
                (11, "Education Services"),
                (12, "Energy Equipment & Services"),
                (13, "Food & Staples Retailing"),
                (14, "Food, Beverage & Tobacco"),
                (15, "Healthcare Equipment & Services"),
                (16, "Hotels, Restaurants & Leisure"),
                (17, "Household & Personal Products"),
                (18, "Independent Power Producers"),
                (19, "Insurance"),
                (20, "Internet & Catalog Retail"),
                (32, "Pharmaceuticals & Biotechnology"),
                (34, "Real Estate"),
                (60, "Software & Services"),
                (63, "Technology Hardware & Equipment"),
                (69, "Telecommunications Services"),
                (70, "Transportation"),
            ]),
            industry_sectors: groups(&[
                ("technology", &[60, 63]),
                ("healthcare", &[15, 32]),
                ("financial", &[3, 10, 19]),
                ("real_estate", &[34]),
                ("consumer", &[8, 9, 14, 16, 17, 20]),
            ]),
        }
    }

    /// Built-in vocabulary overlaid with every `*.yml`/`*.yaml` file in `dir`.
    ///
    /// Each file may carry any subset of the sections; entries are merged
    /// key by key, later files winning.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(DealQueryError::Config(format!(
                "vocabulary directory not found: {}",
                dir.display()
            )));
        }
        let mut vocabulary = Self::builtin();
        let mut files: Vec<PathBuf> = Vec::new();
        for ext in ["yml", "yaml"] {
            for entry in glob(&format!("{}/*.{ext}", dir.display()))
                .map_err(|e| DealQueryError::Other(e.into()))?
                .flatten()
            {
                files.push(entry);
            }
        }
        files.sort();
        for path in files {
            vocabulary.load_file(&path)?;
        }
        Ok(vocabulary)
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let overlay: Vocabulary = serde_yaml::from_str(&contents)?;
        tracing::info!(path = %path.display(), "loaded vocabulary file");
        self.merge(overlay);
        Ok(())
    }

    fn merge(&mut self, other: Vocabulary) {
        self.transaction_types.extend(other.transaction_types);
        self.statuses.extend(other.statuses);
        self.status_groups.extend(other.status_groups);
        self.relationship_types.extend(other.relationship_types);
        self.advisory_types.extend(other.advisory_types);
        self.industries.extend(other.industries);
        self.industry_sectors.extend(other.industry_sectors);
    }

    /// Label for an id stored in `id_column`, when that column has a table.
    pub fn label(&self, id_column: &str, id: i64) -> Option<&str> {
        let table = match id_column {
            "transactionIdTypeId" => &self.transaction_types,
            "statusId" => &self.statuses,
            "simpleIndustryId" => &self.industries,
            "transactionToCompRelTypeId" => &self.relationship_types,
            "advisorTypeId" => &self.advisory_types,
            _ => return None,
        };
        table.get(&id).map(String::as_str)
    }

    /// Fill label columns a result row lacks from the ids it carries.
    /// Labels the store already returned are kept.
    pub fn label_row(&self, row: &mut Map<String, Value>) {
        for (id_column, name_column) in LABELLED_COLUMNS {
            if row.get(name_column).is_some_and(|v| !v.is_null()) {
                continue;
            }
            let id = match row.get(id_column) {
                Some(Value::Number(n)) => n.as_i64(),
                Some(Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            };
            if let Some(label) = id.and_then(|id| self.label(id_column, id)) {
                row.insert(name_column.to_string(), Value::String(label.to_string()));
            }
        }
    }

    /// Ids of a named group for a filter key (`status` groups, `industry`
    /// sectors). Group names are matched case-insensitively.
    pub fn group(&self, key: &str, name: &str) -> Option<&[i64]> {
        let table = match key {
            "status" => &self.status_groups,
            "industry" => &self.industry_sectors,
            _ => return None,
        };
        let name = name.to_ascii_lowercase();
        table.get(&name).map(Vec::as_slice)
    }
}
