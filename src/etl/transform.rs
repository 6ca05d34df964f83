//! Transformer trait for data transformation

use eyre::Result;

/// Transformer trait for transforming data items
///
/// Implementors define how to transform items:
/// - Row filtering
/// - Column projection
/// - Validation
///
/// Transformers are pure: the same input always yields the same output and
/// nothing outside the returned value changes.
///
/// # Example
/// ```no_run
/// use data_platform::etl::Transformer;
/// use eyre::Result;
///
/// struct Uppercase;
///
/// impl Transformer for Uppercase {
///     type Input = String;
///     type Output = String;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         Ok(input.to_uppercase())
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if transformation fails (validation, conversion, etc.)
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;
}
