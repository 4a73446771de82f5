//! The static join catalog over the transaction schema.
//!
//! Every optional table is a [`JoinName`] variant; its table, alias, ON
//! condition and prerequisites come from an exhaustive match.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{DealQueryError, Result};

/// Placeholder for the base table alias inside join conditions.
pub const BASE_ALIAS_TOKEN: &str = "{base}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinName {
    Company,
    Industry,
    Country,
    Currency,
    TransactionType,
    TransactionStatus,
    TransactionCompanyRel,
    CompRelType,
    RelatedCompany,
    Acquirer,
    Target,
    Seller,
    Investor,
    TransactionToAdvisor,
    AdvisorType,
    AdvisorCompany,
    TargetIndustry,
    TargetCountry,
    AcquirerIndustry,
    AcquirerCountry,
}

/// One optional table join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub name: JoinName,
    pub table: &'static str,
    pub alias: &'static str,
    /// ON condition; [`BASE_ALIAS_TOKEN`] stands for the base alias.
    pub condition: &'static str,
    pub requires: &'static [JoinName],
}

impl JoinSpec {
    pub fn condition_for(&self, base_alias: &str) -> String {
        self.condition.replace(BASE_ALIAS_TOKEN, base_alias)
    }
}

impl JoinName {
    /// Catalog iteration order; alias lookups are first-match in this order.
    pub const ALL: [JoinName; 20] = [
        JoinName::Company,
        JoinName::Industry,
        JoinName::Country,
        JoinName::Currency,
        JoinName::TransactionType,
        JoinName::TransactionStatus,
        JoinName::TransactionCompanyRel,
        JoinName::CompRelType,
        JoinName::RelatedCompany,
        JoinName::Acquirer,
        JoinName::Target,
        JoinName::Seller,
        JoinName::Investor,
        JoinName::TransactionToAdvisor,
        JoinName::AdvisorType,
        JoinName::AdvisorCompany,
        JoinName::TargetIndustry,
        JoinName::TargetCountry,
        JoinName::AcquirerIndustry,
        JoinName::AcquirerCountry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JoinName::Company => "company",
            JoinName::Industry => "industry",
            JoinName::Country => "country",
            JoinName::Currency => "currency",
            JoinName::TransactionType => "transaction_type",
            JoinName::TransactionStatus => "transaction_status",
            JoinName::TransactionCompanyRel => "transaction_company_rel",
            JoinName::CompRelType => "comp_rel_type",
            JoinName::RelatedCompany => "related_company",
            JoinName::Acquirer => "acquirer",
            JoinName::Target => "target",
            JoinName::Seller => "seller",
            JoinName::Investor => "investor",
            JoinName::TransactionToAdvisor => "transaction_to_advisor",
            JoinName::AdvisorType => "advisor_type",
            JoinName::AdvisorCompany => "advisor_company",
            JoinName::TargetIndustry => "target_industry",
            JoinName::TargetCountry => "target_country",
            JoinName::AcquirerIndustry => "acquirer_industry",
            JoinName::AcquirerCountry => "acquirer_country",
        }
    }

    pub fn spec(self) -> JoinSpec {
        use JoinName::*;
        let (table, alias, condition, requires): (_, _, _, &'static [JoinName]) = match self {
            Company => (
                "ciqCompany",
                "c",
                "{base}.companyId = c.companyId",
                &[],
            ),
            Industry => (
                "ciqSimpleIndustry",
                "si",
                "c.simpleIndustryId = si.simpleIndustryId",
                &[Company],
            ),
            Country => (
                "ciqCountryGeo",
                "geo",
                "c.countryId = geo.countryId",
                &[Company],
            ),
            Currency => (
                "ciqCurrency",
                "cur",
                "{base}.currencyId = cur.currencyId",
                &[],
            ),
            TransactionType => (
                "ciqTransactionType",
                "tt",
                "{base}.transactionIdTypeId = tt.transactionIdTypeId",
                &[],
            ),
            TransactionStatus => (
                "ciqTransactionStatus",
                "ts",
                "{base}.statusId = ts.statusId",
                &[],
            ),
            TransactionCompanyRel => (
                "ciqTransactionToCompanyRel",
                "tcr",
                "{base}.transactionId = tcr.transactionId",
                &[],
            ),
            CompRelType => (
                "ciqTransactionToCompRelType",
                "crt",
                "tcr.transactionToCompRelTypeId = crt.transactionToCompRelTypeId",
                &[TransactionCompanyRel],
            ),
            RelatedCompany => (
                "ciqCompany",
                "rc",
                "tcr.companyRelId = rc.companyId",
                &[TransactionCompanyRel],
            ),
            Acquirer => (
                "ciqCompany",
                "acquirer",
                "tcr.companyRelId = acquirer.companyId AND tcr.transactionToCompRelTypeId = 1",
                &[TransactionCompanyRel],
            ),
            // The target is the transaction's own company.
            Target => (
                "ciqCompany",
                "target",
                "{base}.companyId = target.companyId",
                &[],
            ),
            Seller => (
                "ciqCompany",
                "seller",
                "tcr.companyRelId = seller.companyId AND tcr.transactionToCompRelTypeId = 3",
                &[TransactionCompanyRel],
            ),
            Investor => (
                "ciqCompany",
                "investor",
                "tcr.companyRelId = investor.companyId AND tcr.transactionToCompRelTypeId = 4",
                &[TransactionCompanyRel],
            ),
            TransactionToAdvisor => (
                "ciqTransactionToAdvisor",
                "tadv",
                "{base}.transactionId = tadv.transactionId",
                &[],
            ),
            AdvisorType => (
                "ciqAdvisorType",
                "advtype",
                "tadv.advisorTypeId = advtype.advisorTypeId",
                &[TransactionToAdvisor],
            ),
            AdvisorCompany => (
                "ciqCompany",
                "advisor",
                "tadv.companyId = advisor.companyId",
                &[TransactionToAdvisor],
            ),
            TargetIndustry => (
                "ciqSimpleIndustry",
                "targetsi",
                "target.simpleIndustryId = targetsi.simpleIndustryId",
                &[Target],
            ),
            TargetCountry => (
                "ciqCountryGeo",
                "targetgeo",
                "target.countryId = targetgeo.countryId",
                &[Target],
            ),
            AcquirerIndustry => (
                "ciqSimpleIndustry",
                "acquirersi",
                "acquirer.simpleIndustryId = acquirersi.simpleIndustryId",
                &[Acquirer],
            ),
            AcquirerCountry => (
                "ciqCountryGeo",
                "acquirergeo",
                "acquirer.countryId = acquirergeo.countryId",
                &[Acquirer],
            ),
        };
        JoinSpec {
            name: self,
            table,
            alias,
            condition,
            requires,
        }
    }

    /// Joins a filter on the given parameter key always brings in, on top
    /// of whatever its column reference implies.
    pub fn implied_by_filter(key: &str) -> &'static [JoinName] {
        use JoinName::*;
        match key {
            "type" => &[TransactionType],
            "status" => &[TransactionStatus],
            "company" | "companyName" | "companyId" => &[Company],
            "industry" => &[Industry],
            "country" => &[Country],
            "currency" => &[Currency],
            "acquirerId" => &[TransactionCompanyRel, CompRelType, Acquirer],
            "sellerId" => &[TransactionCompanyRel, CompRelType, Seller],
            "investorId" => &[TransactionCompanyRel, CompRelType, Investor],
            "targetId" => &[Target],
            "advisorId" => &[TransactionToAdvisor, AdvisorCompany],
            _ => &[],
        }
    }
}

impl fmt::Display for JoinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinName {
    type Err = DealQueryError;

    fn from_str(s: &str) -> Result<Self> {
        JoinName::ALL
            .into_iter()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| DealQueryError::Catalog(format!("unknown join {s}")))
    }
}

/// Read-only set of join specifications in catalog order.
#[derive(Debug, Clone)]
pub struct JoinCatalog {
    specs: Vec<JoinSpec>,
}

impl Default for JoinCatalog {
    fn default() -> Self {
        Self::from_specs(JoinName::ALL.into_iter().map(JoinName::spec).collect())
    }
}

impl JoinCatalog {
    pub fn from_specs(specs: Vec<JoinSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[JoinSpec] {
        &self.specs
    }

    pub fn get(&self, name: JoinName) -> Option<&JoinSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Reverse lookup; the first catalog entry carrying the alias wins.
    pub fn join_for_alias(&self, alias: &str) -> Option<JoinName> {
        self.specs.iter().find(|s| s.alias == alias).map(|s| s.name)
    }

    /// Reject catalogs the per-request resolver could only patch up:
    /// duplicate names or aliases, aliases shadowing the base table,
    /// dangling prerequisites and prerequisite cycles.
    pub fn validate(&self, base_alias: &str) -> Result<()> {
        let mut names = HashSet::new();
        let mut aliases = HashSet::new();
        for spec in &self.specs {
            if !names.insert(spec.name) {
                return Err(DealQueryError::Catalog(format!(
                    "join {} defined twice",
                    spec.name
                )));
            }
            if spec.alias == base_alias {
                return Err(DealQueryError::Catalog(format!(
                    "join {} reuses the base alias {base_alias}",
                    spec.name
                )));
            }
            if !aliases.insert(spec.alias) {
                return Err(DealQueryError::Catalog(format!(
                    "duplicate alias {} in join {}",
                    spec.alias, spec.name
                )));
            }
        }
        for spec in &self.specs {
            for dep in spec.requires {
                if !names.contains(dep) {
                    return Err(DealQueryError::Catalog(format!(
                        "join {} requires unknown join {dep}",
                        spec.name
                    )));
                }
            }
        }

        let mut done: HashSet<JoinName> = HashSet::new();
        for spec in &self.specs {
            let mut path = Vec::new();
            self.check_acyclic(spec.name, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn check_acyclic(
        &self,
        name: JoinName,
        path: &mut Vec<JoinName>,
        done: &mut HashSet<JoinName>,
    ) -> Result<()> {
        if done.contains(&name) {
            return Ok(());
        }
        if path.contains(&name) {
            let cycle: Vec<&str> = path.iter().map(|j| j.as_str()).collect();
            return Err(DealQueryError::Catalog(format!(
                "join prerequisites form a cycle: {} -> {name}",
                cycle.join(" -> ")
            )));
        }
        path.push(name);
        if let Some(spec) = self.get(name) {
            for dep in spec.requires {
                self.check_acyclic(*dep, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        JoinCatalog::default().validate("tr").unwrap();
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for join in JoinName::ALL {
            assert_eq!(join.as_str().parse::<JoinName>().unwrap(), join);
        }
        assert!("nope".parse::<JoinName>().is_err());
    }

    #[test]
    fn base_token_is_substituted() {
        let spec = JoinName::Company.spec();
        assert_eq!(spec.condition_for("t0"), "t0.companyId = c.companyId");
    }

    #[test]
    fn alias_lookup_is_first_match() {
        let mut specs = JoinCatalog::default().specs().to_vec();
        specs.push(JoinSpec {
            name: JoinName::Industry,
            table: "ciqCompany",
            alias: "c",
            condition: "{base}.companyId = c.companyId",
            requires: &[],
        });
        let catalog = JoinCatalog::from_specs(specs);
        assert_eq!(catalog.join_for_alias("c"), Some(JoinName::Company));
        assert_eq!(catalog.join_for_alias("zz"), None);
    }

    #[test]
    fn rejects_duplicate_alias() {
        let catalog = JoinCatalog::from_specs(vec![
            JoinName::Company.spec(),
            JoinSpec {
                name: JoinName::Target,
                table: "ciqCompany",
                alias: "c",
                condition: "{base}.companyId = c.companyId",
                requires: &[],
            },
        ]);
        let err = catalog.validate("tr").unwrap_err();
        assert!(err.to_string().contains("duplicate alias c"));
    }

    #[test]
    fn rejects_base_alias_shadowing() {
        let catalog = JoinCatalog::from_specs(vec![JoinName::Company.spec()]);
        assert!(catalog.validate("c").is_err());
    }

    #[test]
    fn rejects_dangling_prerequisite() {
        let catalog = JoinCatalog::from_specs(vec![JoinName::Industry.spec()]);
        let err = catalog.validate("tr").unwrap_err();
        assert!(err.to_string().contains("requires unknown join company"));
    }

    #[test]
    fn rejects_prerequisite_cycle() {
        let catalog = JoinCatalog::from_specs(vec![
            JoinSpec {
                name: JoinName::Company,
                table: "ciqCompany",
                alias: "c",
                condition: "si.simpleIndustryId = c.simpleIndustryId",
                requires: &[JoinName::Industry],
            },
            JoinName::Industry.spec(),
        ]);
        let err = catalog.validate("tr").unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
