#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zoning code classification.
//!
//! Each jurisdiction publishes its own zoning vocabulary (`RM-1`, `R2`,
//! `C-G`, `MU-V`, ...). This crate compiles a jurisdiction's ordered rule
//! table into a [`RuleSet`] once at startup and maps raw codes onto the
//! canonical [`ZoneCategory`] taxonomy. Classification never fails: codes
//! that no rule matches become [`ZoneCategory::Other`].

pub mod land_use;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use zone_map_jurisdiction_models::{ClassificationRuleDef, JurisdictionSource};
use zone_map_zoning_models::ZoneCategory;

/// Errors raised while compiling a rule table.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// A `pattern` rule is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// A rule does not set exactly one matcher.
    #[error("Invalid rule #{index}: {message}")]
    InvalidRule {
        /// Zero-based position of the rule in its table.
        index: usize,
        /// Description of what went wrong.
        message: String,
    },
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Prefix(String),
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, code: &str) -> bool {
        match self {
            Self::Exact(exact) => code == exact,
            Self::Prefix(prefix) => code.starts_with(prefix.as_str()),
            Self::Pattern(re) => re.is_match(code),
        }
    }
}

/// A compiled classification rule.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    matcher: Matcher,
    category: ZoneCategory,
}

impl ClassificationRule {
    /// Compiles a rule definition.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the definition sets zero or several
    /// matchers, or its pattern does not compile.
    pub fn compile(index: usize, def: &ClassificationRuleDef) -> Result<Self, ClassifierError> {
        let matcher = match (&def.exact, &def.prefix, &def.pattern) {
            (Some(exact), None, None) => Matcher::Exact(normalize_code(exact)),
            (None, Some(prefix), None) => Matcher::Prefix(normalize_code(prefix)),
            (None, None, Some(pattern)) => {
                // Codes are upper-cased before matching.
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ClassifierError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                Matcher::Pattern(re)
            }
            _ => {
                return Err(ClassifierError::InvalidRule {
                    index,
                    message: "exactly one of `exact`, `prefix`, or `pattern` must be set"
                        .to_string(),
                });
            }
        };

        Ok(Self {
            matcher,
            category: def.category,
        })
    }

    /// Category assigned when this rule matches.
    #[must_use]
    pub const fn category(&self) -> ZoneCategory {
        self.category
    }
}

/// An ordered, compiled rule table. First match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    /// Compiles an ordered list of rule definitions.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] for the first rule that fails to compile.
    pub fn compile(defs: &[ClassificationRuleDef]) -> Result<Self, ClassifierError> {
        let rules = defs
            .iter()
            .enumerate()
            .map(|(index, def)| ClassificationRule::compile(index, def))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Number of rules in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the category of the first matching rule, if any.
    #[must_use]
    pub fn first_match(&self, raw: &str) -> Option<ZoneCategory> {
        let code = normalize_code(raw);
        if code.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&code))
            .map(ClassificationRule::category)
    }
}

/// Classifies a raw zoning code with a jurisdiction's rule table.
///
/// Unrecognized or empty codes return [`ZoneCategory::Other`].
#[must_use]
pub fn classify(raw_zone_code: &str, rules: &RuleSet) -> ZoneCategory {
    rules.first_match(raw_zone_code).unwrap_or_else(|| {
        log::trace!("Unrecognized zone code '{raw_zone_code}', classifying as other");
        ZoneCategory::Other
    })
}

/// Upper-cases a code and collapses internal whitespace.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Splits a combined split-zoning code (`R-1/C-G`, `R-1, C-G`) into its
/// component codes. Single codes return one component.
#[must_use]
pub fn split_components(raw: &str) -> Vec<&str> {
    raw.split(['/', ';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// A jurisdiction's complete zoning vocabulary: zoning code rules, future
/// land use rules, and split-code handling.
#[derive(Debug, Clone, Default)]
pub struct ZoneVocabulary {
    zoning: RuleSet,
    future_land_use: RuleSet,
    split_codes: bool,
}

impl ZoneVocabulary {
    /// Compiles the vocabulary declared by a jurisdiction definition.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if any rule fails to compile.
    pub fn from_source(source: &JurisdictionSource) -> Result<Self, ClassifierError> {
        Ok(Self {
            zoning: RuleSet::compile(&source.classification)?,
            future_land_use: RuleSet::compile(&source.future_land_use)?,
            split_codes: source.features.split_codes,
        })
    }

    /// Builds a vocabulary from already-compiled rule tables.
    #[must_use]
    pub const fn new(zoning: RuleSet, future_land_use: RuleSet, split_codes: bool) -> Self {
        Self {
            zoning,
            future_land_use,
            split_codes,
        }
    }

    /// The zoning code rule table.
    #[must_use]
    pub const fn zoning_rules(&self) -> &RuleSet {
        &self.zoning
    }

    /// Classifies a raw zoning code. For combined split codes the first
    /// component determines the category.
    #[must_use]
    pub fn classify_zone(&self, raw_zone_code: &str) -> ZoneCategory {
        match self.primary_component(raw_zone_code) {
            Some(primary) => classify(primary, &self.zoning),
            None => classify(raw_zone_code, &self.zoning),
        }
    }

    /// Returns `true` if the code names more than one district and this
    /// jurisdiction writes split zoning as combined codes.
    #[must_use]
    pub fn is_split_code(&self, raw_zone_code: &str) -> bool {
        self.primary_component(raw_zone_code).is_some()
    }

    /// First district of a combined code. Codes whose first piece is not a
    /// known district on its own (`O/I`) are single codes.
    fn primary_component<'a>(&self, raw_zone_code: &'a str) -> Option<&'a str> {
        if !self.split_codes {
            return None;
        }
        let components = split_components(raw_zone_code);
        if components.len() < 2 {
            return None;
        }
        let primary = components[0];
        self.zoning.first_match(primary).map(|_| primary)
    }

    /// Classifies a future land use designation, using the jurisdiction's
    /// own rules when it has any and keyword matching otherwise.
    #[must_use]
    pub fn classify_future_land_use(&self, designation: &str) -> ZoneCategory {
        if self.future_land_use.is_empty() {
            return land_use::classify_by_keyword(designation);
        }
        self.future_land_use
            .first_match(designation)
            .unwrap_or_else(|| land_use::classify_by_keyword(designation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(
        exact: Option<&str>,
        prefix: Option<&str>,
        pattern: Option<&str>,
        category: ZoneCategory,
    ) -> ClassificationRuleDef {
        ClassificationRuleDef {
            exact: exact.map(String::from),
            prefix: prefix.map(String::from),
            pattern: pattern.map(String::from),
            category,
        }
    }

    fn county_rules() -> RuleSet {
        RuleSet::compile(&[
            rule(Some("MU-OI"), None, None, ZoneCategory::MixedUse),
            rule(None, Some("MU"), None, ZoneCategory::MixedUse),
            rule(None, None, Some(r"^R[SMU]?-?\d"), ZoneCategory::Residential),
            rule(None, Some("C-"), None, ZoneCategory::Commercial),
            rule(None, Some("I-"), None, ZoneCategory::Industrial),
            rule(None, Some("OI"), None, ZoneCategory::Institutional),
        ])
        .unwrap()
    }

    #[test]
    fn classifies_known_codes() {
        let rules = county_rules();
        assert_eq!(classify("RM-1", &rules), ZoneCategory::Residential);
        assert_eq!(classify("RS-8", &rules), ZoneCategory::Residential);
        assert_eq!(classify("R2", &rules), ZoneCategory::Residential);
        assert_eq!(classify("C-G", &rules), ZoneCategory::Commercial);
        assert_eq!(classify("I-2", &rules), ZoneCategory::Industrial);
        assert_eq!(classify("OI-1", &rules), ZoneCategory::Institutional);
        assert_eq!(classify("MU-V", &rules), ZoneCategory::MixedUse);
    }

    #[test]
    fn lowercase_pattern_matches_any_case() {
        let rules = RuleSet::compile(&[
            rule(None, None, Some(r"^(gc|cbd)$"), ZoneCategory::Commercial),
            rule(None, Some("ar"), None, ZoneCategory::Residential),
        ])
        .unwrap();
        assert_eq!(classify("GC", &rules), ZoneCategory::Commercial);
        assert_eq!(classify("cbd", &rules), ZoneCategory::Commercial);
        assert_eq!(classify("ar", &rules), ZoneCategory::Residential);
        assert_eq!(classify("GCX", &rules), ZoneCategory::Other);
    }

    #[test]
    fn matching_is_case_and_whitespace_insensitive() {
        let rules = county_rules();
        assert_eq!(classify("  rm-1 ", &rules), ZoneCategory::Residential);
        assert_eq!(classify("c-g", &rules), ZoneCategory::Commercial);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = RuleSet::compile(&[
            rule(None, Some("RM"), None, ZoneCategory::Residential),
            rule(None, Some("R"), None, ZoneCategory::Other),
        ])
        .unwrap();
        assert_eq!(classify("RM-2", &rules), ZoneCategory::Residential);
        assert_eq!(classify("RB", &rules), ZoneCategory::Other);
    }

    #[test]
    fn unknown_and_empty_codes_are_other() {
        let rules = county_rules();
        assert_eq!(classify("XYZ-99", &rules), ZoneCategory::Other);
        assert_eq!(classify("", &rules), ZoneCategory::Other);
        assert_eq!(classify("   ", &rules), ZoneCategory::Other);
        assert_eq!(classify("RM-1", &RuleSet::default()), ZoneCategory::Other);
    }

    #[test]
    fn rejects_invalid_rules() {
        let err = RuleSet::compile(&[rule(None, None, Some("(unclosed"), ZoneCategory::Other)])
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidPattern { .. }));

        let err = RuleSet::compile(&[
            rule(None, Some("R"), None, ZoneCategory::Residential),
            rule(Some("C"), Some("C"), None, ZoneCategory::Commercial),
        ])
        .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidRule { index: 1, .. }));

        let err = RuleSet::compile(&[rule(None, None, None, ZoneCategory::Other)]).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn split_codes_use_primary_component() {
        let vocab = ZoneVocabulary::new(county_rules(), RuleSet::default(), true);
        assert_eq!(vocab.classify_zone("RS-8/C-G"), ZoneCategory::Residential);
        assert!(vocab.is_split_code("RS-8/C-G"));
        assert!(vocab.is_split_code("RS-8, C-G"));
        assert!(!vocab.is_split_code("RS-8"));

        let plain = ZoneVocabulary::new(county_rules(), RuleSet::default(), false);
        assert!(!plain.is_split_code("RS-8/C-G"));
    }

    #[test]
    fn code_with_unknown_first_piece_is_not_split() {
        let rules = RuleSet::compile(&[
            rule(Some("O/I"), None, None, ZoneCategory::Institutional),
            rule(None, Some("R-"), None, ZoneCategory::Residential),
        ])
        .unwrap();
        let vocab = ZoneVocabulary::new(rules, RuleSet::default(), true);
        assert_eq!(vocab.classify_zone("O/I"), ZoneCategory::Institutional);
        assert!(!vocab.is_split_code("O/I"));
        assert_eq!(vocab.classify_zone("R-1/O"), ZoneCategory::Residential);
        assert!(vocab.is_split_code("R-1/O"));
    }

    #[test]
    fn future_land_use_prefers_jurisdiction_rules() {
        let flu = RuleSet::compile(&[rule(Some("TC"), None, None, ZoneCategory::MixedUse)]).unwrap();
        let vocab = ZoneVocabulary::new(county_rules(), flu, false);
        assert_eq!(vocab.classify_future_land_use("TC"), ZoneCategory::MixedUse);
        assert_eq!(
            vocab.classify_future_land_use("Low Density Residential"),
            ZoneCategory::Residential
        );
    }
}
