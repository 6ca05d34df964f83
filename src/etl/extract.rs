//! Extractor trait for reading tables from a source

use eyre::Result;

/// Extractor trait for extracting data from a source
///
/// Implementors define how to produce an item (usually a table) from
/// sources like:
/// - Local CSV files
/// - Remote object storage
///
/// # Example
/// ```no_run
/// use data_platform::etl::Extractor;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct LineCounter {
///     path: PathBuf,
/// }
///
/// impl Extractor for LineCounter {
///     type Item = usize;
///
///     async fn extract(&self) -> Result<Self::Item> {
///         Ok(std::fs::read_to_string(&self.path)?.lines().count())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// The type of item extracted
    type Item: Send;

    /// Extract the item from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (missing file, network, parsing, etc.)
    fn extract(&self) -> impl std::future::Future<Output = Result<Self::Item>> + Send;
}
