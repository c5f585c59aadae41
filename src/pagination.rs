//! Paginated finds that carry the `piggy` directive through.

use crate::error::PiggyBackError;
use crate::executor::LifeExecutor;
use crate::piggy_back::{FindOptions, PiggyBack, PiggyDirective};
use crate::record::Record;
use serde::Deserialize;

const DEFAULT_PER_PAGE: u64 = 10;

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

/// Options of a paginated collection
///
/// `order_by` wins over `order` and `join` over `joins`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginateOptions {
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub join: Option<String>,
    #[serde(default)]
    pub joins: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    #[serde(default)]
    pub piggy: Option<PiggyDirective>,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            conditions: None,
            order_by: None,
            order: None,
            join: None,
            joins: None,
            include: Vec::new(),
            select: None,
            per_page: DEFAULT_PER_PAGE,
            piggy: None,
        }
    }
}

impl PaginateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn piggy(mut self, directive: impl Into<PiggyDirective>) -> Self {
        self.piggy = Some(directive.into());
        self
    }

    /// Row offset of 1-based `page`; page 0 is treated as the first page
    pub fn offset(&self, page: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Find options for `page`
    pub fn find_options(&self, page: u64) -> FindOptions {
        FindOptions {
            select: self.select.clone(),
            joins: self.join.clone().or_else(|| self.joins.clone()),
            conditions: self.conditions.clone(),
            order: self.order_by.clone().or_else(|| self.order.clone()),
            limit: Some(self.per_page),
            offset: Some(self.offset(page)),
            include: self.include.clone(),
            readonly: None,
            piggy: self.piggy.clone(),
        }
    }
}

impl PiggyBack {
    /// Load `page` of `entity` with piggy-backs applied.
    pub fn paginate<E: LifeExecutor + ?Sized>(
        &self,
        executor: &E,
        entity: &str,
        options: &PaginateOptions,
        page: u64,
    ) -> Result<Vec<Record>, PiggyBackError> {
        self.find_all(executor, entity, &options.find_options(page))
    }
}
