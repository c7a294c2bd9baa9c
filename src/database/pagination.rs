use serde::Serialize;

use super::error::{Error, HtmlError};

/// Page selected by the `page` and `limit` query parameters.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    path: String,
    query: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64, path: &str, query: Vec<(String, String)>) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            path: path.to_string(),
            query,
        }
    }

    /// Rows skipped before this page, `None` when it does not fit in an `i64`.
    pub fn checked_offset(&self) -> Option<i64> {
        (self.page - 1).checked_mul(self.limit)
    }

    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }

    /// Link to another page, keeping every other query parameter.
    pub fn link(&self, page: i64) -> String {
        let mut query: Vec<(&str, String)> = self
            .query
            .iter()
            .filter(|(key, _)| key != "page")
            .map(|(key, value)| (key.as_str(), value.to_owned()))
            .collect();
        if page > 1 {
            query.push(("page", page.to_string()));
        }

        match serde_urlencoded::to_string(&query) {
            Ok(encoded) if !encoded.is_empty() => format!("{}?{}", self.path, encoded),
            _ => self.path.to_owned(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: &PageRequest) -> Result<Self, Error> {
        if rows.is_empty() {
            if request.page > 1 {
                return Err(HtmlError::NotFound.new("Invalid page."));
            }
            return Ok(Self::no_rows());
        }

        let next = if request.offset().saturating_add(rows.len() as i64) < total_rows {
            Some(request.link(request.page + 1))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.link(request.page - 1))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    /// Swaps the rows for their client representations.
    pub fn with_results<U>(self, results: Vec<U>) -> PageContext<U> {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: i64, limit: i64) -> PageRequest {
        PageRequest::new(
            page,
            limit,
            "/api/recipes/",
            vec![
                (String::from("tags"), String::from("breakfast")),
                (String::from("page"), page.to_string()),
                (String::from("limit"), limit.to_string()),
            ],
        )
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = PageContext::from_rows(vec![3, 4], 6, &request(2, 2)).unwrap();

        assert_eq!(page.count, 6);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?tags=breakfast&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes/?tags=breakfast&limit=2")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![5], 5, &request(3, 2)).unwrap();

        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn empty_first_page_is_not_an_error() {
        let page = PageContext::<i32>::from_rows(vec![], 0, &request(1, 6)).unwrap();

        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }

    #[test]
    fn huge_pages_have_no_offset() {
        assert_eq!(request(3, 6).checked_offset(), Some(12));
        assert_eq!(request(i64::MAX, 6).checked_offset(), None);
        assert_eq!(request(i64::MAX, 1).checked_offset(), Some(i64::MAX - 1));
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        let error = PageContext::<i32>::from_rows(vec![], 0, &request(4, 6)).unwrap_err();

        assert!(error.is(HtmlError::NotFound));
    }
}
