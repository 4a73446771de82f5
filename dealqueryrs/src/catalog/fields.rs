//! Logical field names and their physical `alias.column` references.

use std::collections::BTreeMap;

use super::joins::BASE_ALIAS_TOKEN;

const BUILTIN_FIELDS: &[(&str, &str)] = &[
    // Transaction fields
    ("type", "{base}.transactionIdTypeId"),
    ("typeName", "tt.transactionIdTypeName"),
    ("year", "{base}.announcedYear"),
    ("month", "{base}.announcedMonth"),
    ("day", "{base}.announcedDay"),
    ("size", "{base}.transactionSize"),
    ("transactionId", "{base}.transactionId"),
    ("status", "{base}.statusId"),
    ("statusName", "ts.statusName"),
    ("currency", "{base}.currencyId"),
    ("currencyCode", "cur.currencyCode"),
    // Company fields
    ("company", "c.companyName"),
    ("companyName", "c.companyName"),
    ("companyId", "c.companyId"),
    ("industry", "si.simpleIndustryId"),
    ("industryDescription", "si.simpleIndustryDescription"),
    ("country", "geo.countryId"),
    ("countryName", "geo.country"),
    // Relationship fields
    ("acquirer", "acquirer.companyName"),
    ("acquirerId", "acquirer.companyId"),
    ("target", "target.companyName"),
    ("targetId", "target.companyId"),
    ("sellerId", "seller.companyId"),
    ("investorId", "investor.companyId"),
    ("advisorId", "advisor.companyId"),
    ("advisorType", "advtype.advisorTypeName"),
    ("relationType", "crt.transactionToCompRelTypeId"),
    ("relationName", "crt.transactionToCompanyRelType"),
    ("leadInvestor", "tcr.leadInvestorFlag"),
    ("individualEquity", "tcr.individualEquity"),
    ("percentAcquired", "tcr.percentAcquired"),
    // Aggregates
    ("count", "COUNT({base}.transactionId)"),
];

/// Static logical -> physical field table, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    fields: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Built-in fields with the base alias substituted, then `overrides`.
    pub fn builtin(base_alias: &str, overrides: &BTreeMap<String, String>) -> Self {
        let mut fields: BTreeMap<String, String> = BUILTIN_FIELDS
            .iter()
            .map(|(k, v)| (k.to_string(), v.replace(BASE_ALIAS_TOKEN, base_alias)))
            .collect();
        for (k, v) in overrides {
            fields.insert(k.clone(), v.replace(BASE_ALIAS_TOKEN, base_alias));
        }
        Self { fields }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Resolve a logical name to a physical reference.
    ///
    /// Names that already carry a qualifier are physical and pass through;
    /// unknown names pass through unchanged as well. Resolution never fails.
    pub fn resolve(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        self.fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> FieldMapping {
        FieldMapping::builtin("tr", &BTreeMap::new())
    }

    #[test]
    fn resolves_known_names() {
        let fields = mapping();
        assert_eq!(fields.resolve("year"), "tr.announcedYear");
        assert_eq!(fields.resolve("industry"), "si.simpleIndustryId");
        assert_eq!(fields.resolve("count"), "COUNT(tr.transactionId)");
    }

    #[test]
    fn qualified_names_pass_through() {
        let fields = mapping();
        assert_eq!(fields.resolve("c.companyName"), "c.companyName");
        // even when the unqualified tail is a known field
        assert_eq!(fields.resolve("x.year"), "x.year");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(mapping().resolve("value"), "value");
    }

    #[test]
    fn overrides_win_and_see_the_base_alias() {
        let overrides = BTreeMap::from([
            ("year".to_string(), "{base}.closedYear".to_string()),
            ("dealValue".to_string(), "tr.transactionSize".to_string()),
        ]);
        let fields = FieldMapping::builtin("t", &overrides);
        assert_eq!(fields.resolve("year"), "t.closedYear");
        assert_eq!(fields.resolve("dealValue"), "tr.transactionSize");
        assert_eq!(fields.resolve("month"), "t.announcedMonth");
    }
}
