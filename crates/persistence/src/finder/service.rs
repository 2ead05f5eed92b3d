//! Query dispatch over a finder.

use crate::config::{StoredQueryConfig, TranslationConfig};
use crate::error::{StorageResult, TranslationError, ValidationError};
use crate::query::Query;
use crate::translation::{
    CriteriaQueryTranslation, CustomQueryTranslation, QueryTranslation, StoredQueryTranslation,
};

use super::{Finder, FinderResult};

/// Translates queries by kind and executes them with a [`Finder`].
///
/// Criteria and custom queries run as plain searches, stored queries as
/// template searches. Scrolling is available for criteria and custom queries.
pub struct QueryService<F> {
    criteria: CriteriaQueryTranslation,
    stored: StoredQueryTranslation,
    custom: CustomQueryTranslation,
    finder: F,
}

impl<F: Finder> QueryService<F> {
    /// Builds the translators and wraps `finder`.
    pub fn new(
        translation: TranslationConfig,
        stored: StoredQueryConfig,
        finder: F,
    ) -> StorageResult<Self> {
        let criteria = CriteriaQueryTranslation::new(translation).map_err(|e| {
            ValidationError::InvalidConfig {
                key: "suggest_pattern".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            criteria,
            stored: StoredQueryTranslation::new(stored),
            custom: CustomQueryTranslation,
            finder,
        })
    }

    /// Returns the wrapped finder.
    pub fn finder(&self) -> &F {
        &self.finder
    }

    /// Translates `query` and runs it.
    pub async fn find(&self, query: &Query) -> StorageResult<FinderResult<F::Item>> {
        match query {
            Query::Criteria(_) => {
                let native = self.criteria.translate(query)?;
                self.finder.find(native).await
            }
            Query::Stored(_) => {
                let native = self.stored.translate(query)?;
                self.finder.find_by_stored(native).await
            }
            Query::Custom(_) => {
                let native = self.custom.translate(query)?;
                self.finder.find(native).await
            }
        }
    }

    /// Translates `query` and opens a scroll over its results.
    pub async fn scroll_start(&self, query: &Query) -> StorageResult<FinderResult<F::Item>> {
        let native = match query {
            Query::Criteria(_) => self.criteria.translate(query)?,
            Query::Custom(_) => self.custom.translate(query)?,
            Query::Stored(_) => {
                return Err(TranslationError::UnsupportedQueryType {
                    translator: "scroll",
                    expected: "criteria or custom",
                    actual: query.kind(),
                }
                .into());
            }
        };
        self.finder.scroll_start(native).await
    }

    /// Fetches the next scroll page.
    pub async fn scroll_next(
        &self,
        cursor: &str,
        size: Option<u64>,
    ) -> StorageResult<FinderResult<F::Item>> {
        self.finder.scroll_next(cursor, size).await
    }

    /// Closes a scroll.
    pub async fn scroll_end(&self, cursor: &str) -> StorageResult<()> {
        self.finder.scroll_end(cursor).await
    }
}
