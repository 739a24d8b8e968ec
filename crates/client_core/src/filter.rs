use std::collections::BTreeMap;

use crate::entity::Entity;

pub const FACET_ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Facet {
    #[default]
    All,
    Is(String),
}

impl Facet {
    /// Blank input and `"all"` (any case) both mean unconstrained.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(FACET_ALL) {
            Self::All
        } else {
            Self::Is(raw.to_string())
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Is(_))
    }
}

impl From<&str> for Facet {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub text: String,
    pub facets: BTreeMap<String, Facet>,
}

impl FilterCriteria {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            facets: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_facet(mut self, field: impl Into<String>, value: impl Into<Facet>) -> Self {
        self.facets.insert(field.into(), value.into());
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.text.trim().is_empty() && !self.facets.values().any(Facet::is_active)
    }

    pub fn matches_text<E: Entity>(&self, entity: &E) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        E::search_fields().iter().any(|name| {
            entity
                .field(name)
                .is_some_and(|value| value.display().to_lowercase().contains(&needle))
        })
    }

    /// A facet naming a field the entity does not have matches nothing.
    pub fn matches_facets<E: Entity>(&self, entity: &E) -> bool {
        self.facets.iter().all(|(name, facet)| match facet {
            Facet::All => true,
            Facet::Is(expected) => entity
                .field(name)
                .is_some_and(|value| value.display() == *expected),
        })
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.matches_text(entity) && self.matches_facets(entity)
    }
}

pub fn apply_filter<E: Entity>(items: &[E], criteria: &FilterCriteria) -> Vec<E> {
    items
        .iter()
        .filter(|item| criteria.matches(*item))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
