//! Backend de specter sobre Elasticsearch.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::ElasticStore;
