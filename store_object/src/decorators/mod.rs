//! Built-in operation decorators

pub mod cache;
pub mod timeout;

pub use cache::CacheDecorator;
pub use timeout::TimeoutDecorator;
