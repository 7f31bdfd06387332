// src/store/filter.rs

use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::Record;

/// Query string accepted by every list endpoint.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListParams {
    #[validate(range(min = 1, max = 1_000_000, message = "page must be between 1 and 1000000"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<i64>,

    pub keywords: Option<String>,

    /// `column:asc` or `column:desc`; `null:null` keeps the default.
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

/// Validated listing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub page: i64,
    pub limit: i64,
    pub keywords: String,
    pub order_column: String,
    pub descending: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            keywords: String::new(),
            order_column: "created_at".to_string(),
            descending: false,
        }
    }
}

impl ListParams {
    /// Resolves defaults and checks the sort column against `R`.
    pub fn resolve<R: Record>(&self) -> AppResult<ListFilter> {
        self.validate()?;

        let mut filter = ListFilter {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(10),
            keywords: self.keywords.clone().unwrap_or_default().trim().to_string(),
            ..ListFilter::default()
        };

        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.is_empty()) {
            let mut parts = order_by.splitn(2, ':');
            let column = parts.next().unwrap_or("null");
            let direction = parts.next().unwrap_or("asc");

            if column != "null" && direction != "null" {
                if !R::is_sortable(column) {
                    return Err(AppError::BadRequest(format!(
                        "Cannot order by '{}'",
                        column
                    )));
                }
                filter.order_column = column.to_string();
                filter.descending = match direction.to_ascii_lowercase().as_str() {
                    "asc" => false,
                    "desc" => true,
                    other => {
                        return Err(AppError::BadRequest(format!(
                            "Unknown order direction '{}'",
                            other
                        )));
                    }
                };
            }
        }

        Ok(filter)
    }
}

impl ListFilter {
    pub fn offset(&self) -> i64 {
        if self.page > 0 && self.limit > 0 {
            (self.page - 1).saturating_mul(self.limit)
        } else {
            0
        }
    }

    /// ceil(count / limit), never below 1.
    pub fn total_pages(&self, count: i64) -> i64 {
        if self.limit > 0 && count > 0 {
            (count + self.limit - 1) / self.limit
        } else {
            1
        }
    }

    /// Keyword as an ILIKE pattern with wildcards escaped.
    pub fn like_pattern(&self) -> Option<String> {
        if self.keywords.is_empty() {
            return None;
        }
        let escaped = self
            .keywords
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lesson::Lesson;

    fn params(order_by: Option<&str>) -> ListParams {
        ListParams {
            order_by: order_by.map(str::to_string),
            ..ListParams::default()
        }
    }

    #[test]
    fn defaults_to_first_page_of_ten_by_creation_time() {
        let filter = params(None).resolve::<Lesson>().unwrap();
        assert_eq!(filter, ListFilter::default());
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let filter = ListFilter {
            page: 3,
            limit: 20,
            ..ListFilter::default()
        };
        assert_eq!(filter.offset(), 40);
    }

    #[test]
    fn total_pages_rounds_up_with_floor_of_one() {
        let filter = ListFilter::default();
        assert_eq!(filter.total_pages(0), 1);
        assert_eq!(filter.total_pages(10), 1);
        assert_eq!(filter.total_pages(11), 2);
        assert_eq!(filter.total_pages(95), 10);
    }

    #[test]
    fn order_by_accepts_known_columns() {
        let filter = params(Some("name:desc")).resolve::<Lesson>().unwrap();
        assert_eq!(filter.order_column, "name");
        assert!(filter.descending);
    }

    #[test]
    fn order_by_null_keeps_default() {
        let filter = params(Some("null:null")).resolve::<Lesson>().unwrap();
        assert_eq!(filter.order_column, "created_at");
        assert!(!filter.descending);
    }

    #[test]
    fn order_by_rejects_unknown_columns() {
        let err = params(Some("password:asc")).resolve::<Lesson>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn zero_limit_fails_validation() {
        let p = ListParams {
            limit: Some(0),
            ..ListParams::default()
        };
        assert!(matches!(p.resolve::<Lesson>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn huge_pages_fail_validation() {
        let p = ListParams {
            page: Some(i64::MAX),
            ..ListParams::default()
        };
        assert!(matches!(p.resolve::<Lesson>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let filter = ListFilter {
            page: i64::MAX,
            limit: 1000,
            ..ListFilter::default()
        };
        assert_eq!(filter.offset(), i64::MAX);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let filter = ListFilter {
            keywords: "50%_off".to_string(),
            ..ListFilter::default()
        };
        assert_eq!(filter.like_pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(ListFilter::default().like_pattern(), None);
    }
}
