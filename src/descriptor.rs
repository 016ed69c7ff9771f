//! Rule descriptor parser
//!
//! A field declares its rules as `;`-separated `name[:param]` tokens, for
//! example `notempty;minlength:5;hasdomain:http://a.com, http://b.com`.
//! Each token is split on its first `:` only, so parameters may themselves
//! contain colons. The descriptor is parsed once into an ordered list of
//! [`RuleInvocation`]s and evaluated from that list thereafter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// One `name[:param]` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInvocation {
    pub rule: String,
    pub param: Option<String>,
}

impl RuleInvocation {
    pub fn new(rule: impl Into<String>, param: Option<&str>) -> Self {
        Self {
            rule: rule.into(),
            param: param.map(str::to_string),
        }
    }
}

impl fmt::Display for RuleInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}:{}", self.rule, param),
            None => write!(f, "{}", self.rule),
        }
    }
}

/// Parsed, ordered rule list for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    invocations: Vec<RuleInvocation>,
}

impl RuleDescriptor {
    /// Parse a descriptor string.
    ///
    /// Blank tokens (such as the one after a trailing `;`) are dropped and a
    /// parameter with nothing after the colon counts as absent. Unknown rule
    /// names are kept; the validator skips them at evaluation time.
    pub fn parse(source: &str) -> Result<Self, DescriptorError> {
        let mut invocations = Vec::new();

        for (position, token) in source.split(';').enumerate() {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let (rule, param) = match token.split_once(':') {
                Some((rule, param)) => {
                    let param = param.trim();
                    (rule.trim(), (!param.is_empty()).then_some(param))
                }
                None => (token, None),
            };

            if rule.is_empty() {
                return Err(DescriptorError::MissingRuleName {
                    position,
                    param: param.unwrap_or_default().to_string(),
                });
            }

            invocations.push(RuleInvocation::new(rule, param));
        }

        Ok(Self { invocations })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleInvocation> {
        self.invocations.iter()
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

impl FromStr for RuleDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, invocation) in self.invocations.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", invocation)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RuleDescriptor {
    type Item = &'a RuleInvocation;
    type IntoIter = std::slice::Iter<'a, RuleInvocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.invocations.iter()
    }
}
