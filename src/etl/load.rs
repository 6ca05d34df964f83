//! Loader trait for writing tables to destinations

use eyre::Result;

/// Loader trait for loading data to a destination
///
/// Implementors define how to persist an item:
/// - Columnar files
/// - Warehouses
///
/// The loader takes ownership of the item but never modifies it; the
/// returned `Output` describes where it went (a path, a row count, ...).
///
/// # Example
/// ```no_run
/// use data_platform::etl::Loader;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct TextLoader {
///     path: PathBuf,
/// }
///
/// impl Loader for TextLoader {
///     type Item = String;
///     type Output = PathBuf;
///
///     async fn load(&self, item: Self::Item) -> Result<Self::Output> {
///         std::fs::write(&self.path, item)?;
///         Ok(self.path.clone())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The type of item to load
    type Item: Send;

    /// What a successful load reports back
    type Output: Send;

    /// Load the item to the destination
    ///
    /// # Errors
    /// Returns an error if loading fails (I/O, network, etc.)
    fn load(
        &self,
        item: Self::Item,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}
