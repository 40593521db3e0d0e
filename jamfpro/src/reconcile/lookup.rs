//! Ordered lookup strategies: by ID first, then by name

use std::fmt;
use std::future::Future;

use crate::api::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum Locator<I> {
    ById(I),
    ByName(String),
}

impl<I: fmt::Display> fmt::Display for Locator<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::ById(id) => write!(f, "ID {}", id),
            Locator::ByName(name) => write!(f, "name '{}'", name),
        }
    }
}

/// Locators tried in order until one succeeds
#[derive(Debug, Clone)]
pub struct LookupChain<I> {
    locators: Vec<Locator<I>>,
}

impl<I> LookupChain<I>
where
    I: Clone + fmt::Display,
{
    /// Blank names are skipped; a freshly imported resource only knows its ID.
    pub fn new(id: Option<I>, name: Option<&str>) -> Self {
        let mut locators = Vec::with_capacity(2);
        if let Some(id) = id {
            locators.push(Locator::ById(id));
        }
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            locators.push(Locator::ByName(name.to_string()));
        }
        Self { locators }
    }

    pub fn by_id_then_name(id: I, name: &str) -> Self {
        Self::new(Some(id), Some(name))
    }

    pub fn locators(&self) -> &[Locator<I>] {
        &self.locators
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Runs `op` for each locator in turn. Any failure moves on to the next
    /// locator; the first success wins.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, LookupFailure>
    where
        F: FnMut(Locator<I>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut failures = Vec::new();

        for locator in &self.locators {
            match op(locator.clone()).await {
                Ok(value) => {
                    if !failures.is_empty() {
                        tracing::info!("Lookup by {} succeeded after fallback", locator);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!("Lookup by {} failed: {}", locator, error);
                    failures.push((locator.to_string(), error));
                }
            }
        }

        Err(LookupFailure { failures })
    }
}

/// Every locator in a chain failed
#[derive(Debug, thiserror::Error)]
#[error("{}", self.summary())]
pub struct LookupFailure {
    pub failures: Vec<(String, ApiError)>,
}

impl LookupFailure {
    /// Worth another attempt when at least one locator failed transiently
    pub fn is_transient(&self) -> bool {
        self.failures.iter().any(|(_, e)| e.is_transient())
    }

    /// Every locator reported that nothing matched
    pub fn is_not_found(&self) -> bool {
        !self.failures.is_empty() && self.failures.iter().all(|(_, e)| e.status() == Some(404))
    }

    pub fn detail(&self) -> String {
        if self.failures.is_empty() {
            return "no ID or name to look up".to_string();
        }
        self.failures
            .iter()
            .map(|(locator, e)| format!("{}: {}", locator, e.detail()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn summary(&self) -> String {
        match self.failures.last() {
            Some((locator, e)) => format!("all lookups failed, last by {}: {}", locator, e),
            None => "no ID or name to look up".to_string(),
        }
    }
}
