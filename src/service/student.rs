//! Student service: the generic repository plus uniqueness checks, lookup by code,
//! free-text search, and paginated listing.

use crate::case::to_snake_case;
use crate::error::AppError;
use crate::model::{Student, EMAIL_TAKEN, SEARCH_COLUMNS, STUDENT_CODE_TAKEN};
use crate::resource::Resource;
use crate::response::{Page, PageMeta};
use crate::service::Repository;
use crate::sql::{Fields, Filter, QueryOptions, SortOrder};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_SORT: &str = "first_name";

/// Parsed `/paginated` query.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    /// Column name.
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            sort_by: DEFAULT_SORT.to_string(),
            sort_order: SortOrder::Asc,
        }
    }
}

impl PageRequest {
    /// Unparsable or out-of-range values fall back to defaults; `limit` is capped at `MAX_LIMIT`.
    /// `sortBy` takes the API field name and must name a known column.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let mut req = PageRequest::default();
        if let Some(page) = params.get("page").and_then(|p| p.trim().parse::<u64>().ok()) {
            req.page = page.max(1);
        }
        if let Some(limit) = params.get("limit").and_then(|l| l.trim().parse::<u64>().ok()) {
            req.limit = limit.clamp(1, MAX_LIMIT);
        }
        req.search = params
            .get("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(sort_by) = params.get("sortBy") {
            let column = to_snake_case(sort_by.trim());
            if Student::column(&column).is_some() {
                req.sort_by = column;
            }
        }
        if let Some(order) = params.get("sortOrder") {
            req.sort_order = SortOrder::parse(order.trim());
        }
        req
    }

    fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// OR-substring match, case-insensitive, across first name, last name, code, and email.
pub fn search_filter(term: &str) -> Filter {
    Filter::new().contains_any(SEARCH_COLUMNS, term)
}

#[derive(Clone)]
pub struct StudentService {
    repo: Arc<dyn Repository<Student>>,
}

impl StudentService {
    pub fn new(repo: Arc<dyn Repository<Student>>) -> Self {
        StudentService { repo }
    }

    pub fn repository(&self) -> &dyn Repository<Student> {
        self.repo.as_ref()
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Student>, AppError> {
        self.repo
            .find_first(&Filter::new().eq("student_code", code), &QueryOptions::new())
            .await
    }

    /// Exact, case-sensitive match, optionally ignoring one record.
    pub async fn is_student_code_taken(&self, code: &str, exclude_id: Option<i64>) -> Result<bool, AppError> {
        self.repo.exists(&excluding(Filter::new().eq("student_code", code), exclude_id)).await
    }

    /// Emails are stored lowercase; callers pass the normalised value.
    pub async fn is_email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, AppError> {
        self.repo.exists(&excluding(Filter::new().eq("email", email), exclude_id)).await
    }

    /// Check code and email in `fields` (when present) against other records.
    /// The store's unique constraints remain the source of truth; this only
    /// turns the common case into a precise message before writing.
    pub async fn ensure_unique(&self, fields: &Fields, exclude_id: Option<i64>) -> Result<(), AppError> {
        if let Some(code) = fields.get("student_code").and_then(|v| v.as_str()) {
            if self.is_student_code_taken(code, exclude_id).await? {
                return Err(AppError::Duplicate(STUDENT_CODE_TAKEN.to_string()));
            }
        }
        if let Some(email) = fields.get("email").and_then(|v| v.as_str()) {
            if self.is_email_taken(email, exclude_id).await? {
                return Err(AppError::Duplicate(EMAIL_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    /// Ordered by first name, then last name.
    pub async fn search(&self, term: &str) -> Result<Vec<Student>, AppError> {
        let options = QueryOptions::new()
            .order_by("first_name", SortOrder::Asc)
            .order_by("last_name", SortOrder::Asc);
        self.repo.find_many(&search_filter(term), &options).await
    }

    /// List and count run concurrently; the two reads are not mutually consistent.
    pub async fn get_paginated(&self, req: &PageRequest) -> Result<Page<Student>, AppError> {
        let filter = req.search.as_deref().map(search_filter).unwrap_or_default();
        let options = QueryOptions::new()
            .order_by(req.sort_by.clone(), req.sort_order)
            .order_by(Student::PRIMARY_KEY, SortOrder::Asc)
            .offset(req.offset())
            .limit(req.limit);
        let (data, total) = tokio::try_join!(
            self.repo.find_many(&filter, &options),
            self.repo.count(&filter)
        )?;
        Ok(Page {
            data,
            pagination: PageMeta::new(req.page, req.limit, total),
        })
    }
}

fn excluding(filter: Filter, exclude_id: Option<i64>) -> Filter {
    match exclude_id {
        Some(id) => filter.not_eq(Student::PRIMARY_KEY, id),
        None => filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MemoryRepository;
    use rstest::rstest;
    use serde_json::json;

    fn fields(code: &str, first: &str, last: &str, email: &str) -> Fields {
        [
            ("student_code", json!(code)),
            ("first_name", json!(first)),
            ("last_name", json!(last)),
            ("email", json!(email)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn service() -> StudentService {
        StudentService::new(Arc::new(MemoryRepository::<Student>::new()))
    }

    async fn seed(svc: &StudentService, n: usize) {
        for i in 0..n {
            svc.repository()
                .create(&fields(&format!("S{i:02}"), &format!("F{i:02}"), "L", &format!("s{i}@x.com")))
                .await
                .unwrap();
        }
    }

    #[rstest]
    #[case(&[], PageRequest::default())]
    #[case(&[("page", "0"), ("limit", "500")], PageRequest { page: 1, limit: MAX_LIMIT, ..PageRequest::default() })]
    #[case(&[("page", "abc"), ("limit", "0")], PageRequest { limit: 1, ..PageRequest::default() })]
    #[case(&[("sortBy", "lastName"), ("sortOrder", "DESC"), ("search", "  doe ")], PageRequest {
        search: Some("doe".into()),
        sort_by: "last_name".into(),
        sort_order: SortOrder::Desc,
        ..PageRequest::default()
    })]
    #[case(&[("sortBy", "password")], PageRequest::default())]
    fn page_request_parsing(#[case] pairs: &[(&str, &str)], #[case] expected: PageRequest) {
        let params: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert_eq!(PageRequest::from_query(&params), expected);
    }

    #[tokio::test]
    async fn second_page_of_twelve() {
        let svc = service();
        seed(&svc, 12).await;
        let req = PageRequest { page: 2, limit: 5, ..PageRequest::default() };
        let page = svc.get_paginated(&req).await.unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].first_name, "F05");
        assert_eq!(page.pagination.total, 12);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[tokio::test]
    async fn empty_store_paginates_to_nothing() {
        let page = service().get_paginated(&PageRequest::default()).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_next);
        assert!(!page.pagination.has_prev);
    }

    #[tokio::test]
    async fn search_matches_any_field_and_orders_by_name() {
        let svc = service();
        let repo = svc.repository();
        repo.create(&fields("S1", "Zoe", "Doe", "zoe@x.com")).await.unwrap();
        repo.create(&fields("S2", "Adam", "Smith", "adam.doe@x.com")).await.unwrap();
        repo.create(&fields("DOE-3", "Adam", "Brown", "ab@x.com")).await.unwrap();
        repo.create(&fields("S4", "Mia", "Lee", "mia@x.com")).await.unwrap();
        let found = svc.search("doe").await.unwrap();
        let names: Vec<_> = found.iter().map(|s| (s.first_name.as_str(), s.last_name.as_str())).collect();
        assert_eq!(names, vec![("Adam", "Brown"), ("Adam", "Smith"), ("Zoe", "Doe")]);
    }

    #[tokio::test]
    async fn uniqueness_checks_can_exclude_self() {
        let svc = service();
        let s = svc.repository().create(&fields("S1", "Jane", "Doe", "j@x.com")).await.unwrap();
        assert!(svc.is_email_taken("j@x.com", None).await.unwrap());
        assert!(!svc.is_email_taken("j@x.com", Some(s.id)).await.unwrap());
        assert!(!svc.is_student_code_taken("s1", None).await.unwrap());
        let err = svc.ensure_unique(&fields("S2", "A", "B", "j@x.com"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(m) if m == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn find_by_code_is_exact() {
        let svc = service();
        svc.repository().create(&fields("S1", "Jane", "Doe", "j@x.com")).await.unwrap();
        assert!(svc.find_by_code("S1").await.unwrap().is_some());
        assert!(svc.find_by_code("S").await.unwrap().is_none());
    }
}
