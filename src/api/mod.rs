//! HTTP side of the suite: a timed, retrying client and thin endpoint
//! wrappers on top of it.

pub mod client;
pub mod product;
pub mod schema;
pub mod search;

pub use client::{ApiClient, TimedResponse};
pub use product::ProductService;
pub use schema::SchemaValidator;
pub use search::SearchService;
