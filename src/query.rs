//! Listing filters, ordering and the category set derived from stored mods.

use crate::library::ModRecord;
use serde::Serialize;
use std::collections::BTreeSet;

/// Category filter value that disables category filtering.
pub const ALL_CATEGORIES: &str = "__all__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    Exact(String),
}

impl CategoryFilter {
    /// Absent, empty or the `__all__` sentinel (any case) mean no filtering.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => CategoryFilter::All,
            Some(value) if value.is_empty() => CategoryFilter::All,
            Some(value) if value.eq_ignore_ascii_case(ALL_CATEGORIES) => CategoryFilter::All,
            Some(value) => CategoryFilter::Exact(value.to_string()),
        }
    }

    pub fn as_exact(&self) -> Option<&str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Exact(value) => Some(value),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Exact(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModQuery {
    pub name: Option<String>,
    pub category: CategoryFilter,
}

impl ModQuery {
    pub fn new(name: Option<&str>, category: Option<&str>) -> Self {
        Self::default()
            .with_name(name)
            .with_category(CategoryFilter::parse(category))
    }

    /// Surrounding whitespace is ignored; a blank filter matches everything.
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.name.is_none() && self.category == CategoryFilter::All
    }

    pub fn matches(&self, record: &ModRecord) -> bool {
        self.matches_name(record.name()) && self.matches_category(&record.fields.category)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        match &self.name {
            None => true,
            Some(needle) => name.to_lowercase().contains(needle.as_str()),
        }
    }

    pub fn matches_category(&self, category: &str) -> bool {
        match &self.category {
            CategoryFilter::All => true,
            CategoryFilter::Exact(expected) => category == expected,
        }
    }

    /// Keeps matching records and puts them in listing order.
    pub fn apply(&self, records: Vec<ModRecord>) -> Vec<ModRecord> {
        let mut records: Vec<ModRecord> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();
        sort_listing(&mut records);
        records
    }
}

/// Name ascending, case-insensitive, then id ascending.
pub fn sort_listing(records: &mut [ModRecord]) {
    records.sort_by_cached_key(|record| (record.name().to_lowercase(), record.id));
}

/// Non-blank categories, once each, case-insensitive alphabetical.
pub fn distinct_categories<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let unique: BTreeSet<String> = values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect();
    let mut categories: Vec<String> = unique.into_iter().collect();
    categories.sort_by_cached_key(|value| (value.to_lowercase(), value.clone()));
    categories
}

/// A detached copy of one filtered listing. Stale after any store mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub query: ModQuery,
    pub records: Vec<ModRecord>,
}

impl Listing {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModRecord> {
        self.records.get(index)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(ModRecord::name).collect()
    }
}
