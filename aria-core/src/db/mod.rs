// Database layer: PostgreSQL connection pool and job repository

pub mod pool;
pub mod repositories;

pub use pool::DbPool;
pub use repositories::job::JobRepository;
