//! Pluggable networking traits.
//!
//! External crates implement these to provide data fetching capabilities.

use std::future::Future;
use std::pin::Pin;

use crate::models::types::Result;

/// Query string parameters for one request
pub type Query<'a> = [(&'a str, String)];

/// Fetch the raw body of one DataMall request
///
/// Implementations report non-success HTTP statuses as
/// [`TransitError::HttpStatus`](crate::TransitError::HttpStatus) and transport
/// failures as [`TransitError::Network`](crate::TransitError::Network). They
/// must not retry.
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a Query<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;
}

impl<T: DataFetcher + ?Sized> DataFetcher for &T {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a Query<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        (**self).fetch(endpoint, query)
    }
}

impl<T: DataFetcher + ?Sized> DataFetcher for std::sync::Arc<T> {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a Query<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        (**self).fetch(endpoint, query)
    }
}
