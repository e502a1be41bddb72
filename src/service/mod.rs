//! Repository contract, its PostgreSQL and in-memory implementations, and the student service.

mod memory;
mod postgres;
mod repository;
mod student;
mod validation;
pub use memory::MemoryRepository;
pub use postgres::PgRepository;
pub use repository::Repository;
pub use student::{search_filter, PageRequest, StudentService, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use validation::{is_email, parse_id, FieldRule, Format, RequestValidator};
