// Repository implementations over the connection pool

pub mod job;

pub use job::JobRepository;
