pub mod concurrency;
pub mod dispatch;
pub mod pagination;
pub mod retry;
