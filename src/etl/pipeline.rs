//! Pipeline orchestration for ETL operations

use super::{Extractor, Loader, Transformer};
use arrow::record_batch::RecordBatch;
use eyre::Result;

/// Anything the pipeline can report a row count for
pub trait Rows {
    fn row_count(&self) -> usize;
}

impl Rows for RecordBatch {
    fn row_count(&self) -> usize {
        self.num_rows()
    }
}

impl<T> Rows for Vec<T> {
    fn row_count(&self) -> usize {
        self.len()
    }
}

/// ETL Pipeline that orchestrates Extract, Transform, and Load operations
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (must transform from E::Item)
/// - `L`: Loader type (must load T::Output)
///
/// Every stage runs unconditionally and the first failure aborts the run.
/// Files written by earlier stages are not rolled back.
///
/// # Example
/// ```no_run
/// use data_platform::etl::Pipeline;
/// use data_platform::storage::{CsvReader, ParquetWriter};
/// use data_platform::transform::AdultFilter;
///
/// # async fn example() -> eyre::Result<()> {
/// let pipeline = Pipeline::new(
///     CsvReader::new("data/raw/input.csv"),
///     AdultFilter,
///     ParquetWriter::new("data/processed/output.parquet"),
/// );
///
/// let path = pipeline.run().await?;
/// println!("Wrote {}", path.display());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T, L> {
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extractor,
    E::Item: Rows,
    T: Transformer<Input = E::Item>,
    T::Output: Rows,
    L: Loader<Item = T::Output>,
{
    /// Create a new pipeline
    pub fn new(extractor: E, transformer: T, loader: L) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Extract from source
    /// 2. Transform
    /// 3. Load to destination
    ///
    /// Returns whatever the loader reports
    ///
    /// # Errors
    /// Returns an error if any stage fails
    pub async fn run(&self) -> Result<L::Output> {
        log::info!("Starting ETL pipeline");

        // Extract
        log::debug!("Extracting from source...");
        let extracted = self.extractor.extract().await?;
        log::info!("Extracted {} rows", extracted.row_count());

        if extracted.row_count() == 0 {
            log::warn!("No rows extracted, loading an empty table");
        }

        // Transform
        log::debug!("Transforming rows...");
        let transformed = self.transformer.transform(extracted)?;
        log::info!("Transformed to {} rows", transformed.row_count());

        // Load
        log::debug!("Loading to destination...");
        let output = self.loader.load(transformed).await?;
        log::info!("ETL pipeline complete");

        Ok(output)
    }
}
