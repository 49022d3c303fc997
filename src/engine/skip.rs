//! Link skipping rules

use regex::Regex;

use super::EngineError;

/// Schemes the checker can resolve; everything else is skipped
const CHECKABLE_SCHEMES: &[&str] = &["http", "https"];

/// Compiled `linksToSkip` patterns
#[derive(Debug, Default)]
pub(crate) struct SkipRules {
    patterns: Vec<Regex>,
}

impl SkipRules {
    pub(crate) fn compile(patterns: &[String]) -> Result<Self, EngineError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| EngineError::InvalidSkipPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `url` should be reported as SKIPPED without a request
    pub(crate) fn should_skip(&self, url: &url::Url) -> bool {
        if !CHECKABLE_SCHEMES.contains(&url.scheme()) {
            return true;
        }
        let href = url.as_str();
        self.patterns.iter().any(|re| re.is_match(href))
    }
}
