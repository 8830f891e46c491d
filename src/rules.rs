/*!
 * Per-path check rules and their resolution against the global configuration
 */

use std::str::FromStr;

use glob_match::glob_match;

use crate::config::SnapshotConfiguration;
use crate::error::SnapshotError;
use crate::types::Attribute;

/// What a rule says about one attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleDecision {
    /// Defer to the global configuration
    #[default]
    Unspecified,
    /// Always check, whatever the configuration says
    Check,
    /// Skip unless the configuration is overridden by an explicit check
    Skip,
}

/// Per-path override of which attributes to check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindRule {
    size: RuleDecision,
    modified: RuleDecision,
    md5: RuleDecision,
    permissions: RuleDecision,
}

impl FindRule {
    /// A rule that decides nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decision for one attribute
    pub fn with(mut self, attribute: Attribute, decision: RuleDecision) -> Self {
        *self.slot(attribute) = decision;
        self
    }

    /// Force a check of `attribute`
    pub fn check(self, attribute: Attribute) -> Self {
        self.with(attribute, RuleDecision::Check)
    }

    /// Skip `attribute`
    pub fn skip(self, attribute: Attribute) -> Self {
        self.with(attribute, RuleDecision::Skip)
    }

    pub fn decision(&self, attribute: Attribute) -> RuleDecision {
        match attribute {
            Attribute::Size => self.size,
            Attribute::ModificationTime => self.modified,
            Attribute::Md5 => self.md5,
            Attribute::Permissions => self.permissions,
        }
    }

    /// True when no attribute is decided; such a rule acts like no rule
    pub fn is_empty(&self) -> bool {
        Attribute::all().all(|a| self.decision(a) == RuleDecision::Unspecified)
    }

    fn slot(&mut self, attribute: Attribute) -> &mut RuleDecision {
        match attribute {
            Attribute::Size => &mut self.size,
            Attribute::ModificationTime => &mut self.modified,
            Attribute::Md5 => &mut self.md5,
            Attribute::Permissions => &mut self.permissions,
        }
    }
}

/// Parses `+md5,-mtime`: `+` forces a check, `-` skips.
impl FromStr for FindRule {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rule = FindRule::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (decision, name) = if let Some(name) = token.strip_prefix('+') {
                (RuleDecision::Check, name)
            } else if let Some(name) = token.strip_prefix('-') {
                (RuleDecision::Skip, name)
            } else {
                return Err(SnapshotError::InvalidRule(format!(
                    "'{}' must start with '+' or '-'",
                    token
                )));
            };
            let attribute = Attribute::from_str(name).map_err(|_| {
                SnapshotError::InvalidRule(format!("unknown attribute '{}'", name))
            })?;
            rule = rule.with(attribute, decision);
        }
        Ok(rule)
    }
}

/// Decide whether `attribute` must be captured and compared.
///
/// An explicit check in the rule wins over everything, a global disable wins
/// over an explicit skip, and with neither the attribute is checked.
pub fn should_check(
    attribute: Attribute,
    rule: Option<&FindRule>,
    config: &SnapshotConfiguration,
) -> bool {
    let decision = rule.map(|r| r.decision(attribute)).unwrap_or_default();

    if decision == RuleDecision::Check {
        return true;
    }
    if !config.is_enabled(attribute) {
        return false;
    }
    decision != RuleDecision::Skip
}

/// Glob patterns mapped to rules, first match wins
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, FindRule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for paths matching `pattern`
    pub fn add(&mut self, pattern: impl Into<String>, rule: FindRule) {
        self.rules.push((pattern.into(), rule));
    }

    pub fn with_rule(mut self, pattern: impl Into<String>, rule: FindRule) -> Self {
        self.add(pattern, rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule for a normalized relative path, matched against the full path and the file name
    pub fn rule_for(&self, path: &str) -> Option<&FindRule> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        self.rules
            .iter()
            .find(|(pattern, rule)| {
                !rule.is_empty() && (glob_match(pattern, path) || glob_match(pattern, file_name))
            })
            .map(|(_, rule)| rule)
    }
}

/// Parses `PATTERN=+md5,-size`
impl FromStr for RuleSet {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pattern, spec) = s
            .rsplit_once('=')
            .ok_or_else(|| SnapshotError::InvalidRule(format!("'{}' is not PATTERN=SPEC", s)))?;
        if pattern.is_empty() {
            return Err(SnapshotError::InvalidRule(format!("'{}' has an empty pattern", s)));
        }
        Ok(RuleSet::new().with_rule(pattern, spec.parse()?))
    }
}

impl Extend<(String, FindRule)> for RuleSet {
    fn extend<T: IntoIterator<Item = (String, FindRule)>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

impl IntoIterator for RuleSet {
    type Item = (String, FindRule);
    type IntoIter = std::vec::IntoIter<(String, FindRule)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}
