//! Integration tests for the ETL pipeline
//!
//! End-to-end runs over real files in a temporary data directory.

use arrow::array::{AsArray, Int64Array, StringArray};
use arrow::datatypes::Int64Type;
use data_platform::etl::{self, Pipeline, Transformer};
use data_platform::storage::{CsvReader, ParquetWriter, read_parquet};
use data_platform::{AdultFilter, PlatformError, Settings};
use eyre::Result;
use tempfile::TempDir;

fn settings_with_input(temp: &TempDir, name: &str, contents: &str) -> Settings {
    let settings = Settings::with_data_dir(temp.path());
    std::fs::create_dir_all(&settings.raw_dir).unwrap();
    std::fs::write(settings.raw_path(name), contents).unwrap();
    settings
}

#[tokio::test]
async fn test_default_job_end_to_end() -> Result<()> {
    let temp = TempDir::new()?;
    let settings = settings_with_input(
        &temp,
        "input.csv",
        "id,name,email,age\n1,Ann,ann@example.com,25\n2,Bo,bo@example.com,17\n3,Cy,,18\n4,Di,di@example.com,19\n",
    );

    let path = etl::run(&settings).await?;

    assert_eq!(path, settings.processed_dir.join("output.parquet"));
    let table = read_parquet(&path)?;
    let names: Vec<String> = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec!["id", "name", "email", "age"]);
    assert_eq!(
        table.column(0).as_primitive::<Int64Type>(),
        &Int64Array::from(vec![1, 4])
    );
    assert_eq!(
        table.column(1).as_string::<i32>(),
        &StringArray::from(vec!["Ann", "Di"])
    );
    Ok(())
}

#[tokio::test]
async fn test_rerun_overwrites_output() -> Result<()> {
    let temp = TempDir::new()?;
    let settings = settings_with_input(&temp, "input.csv", "id,age\n1,25\n2,30\n");
    etl::run(&settings).await?;

    std::fs::write(settings.raw_path("input.csv"), "id,age\n1,25\n2,3\n")?;
    let path = etl::run(&settings).await?;

    assert_eq!(read_parquet(&path)?.num_rows(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_input_writes_empty_output() -> Result<()> {
    let temp = TempDir::new()?;
    let settings = settings_with_input(&temp, "input.csv", "id,age\n");

    let path = etl::run(&settings).await?;

    let table = read_parquet(&path)?;
    assert_eq!(table.num_rows(), 0);
    assert_eq!(table.num_columns(), 2);
    Ok(())
}

#[tokio::test]
async fn test_non_numeric_age_fails() {
    let temp = TempDir::new().unwrap();
    let settings = settings_with_input(&temp, "input.csv", "id,age\n1,old\n2,young\n");

    let err = etl::run(&settings).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PlatformError>(),
        Some(PlatformError::NonNumericColumn { column, .. }) if column == "age"
    ));
    assert!(!settings.processed_path("output.parquet").exists());
}

#[tokio::test]
async fn test_hand_built_pipeline() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("people.csv");
    let target = temp.path().join("out/adults.parquet");
    std::fs::write(&source, "id,age\n1,80\n2,8\n3,44\n")?;

    let pipeline = Pipeline::new(CsvReader::new(&source), AdultFilter, ParquetWriter::new(&target));
    let path = pipeline.run().await?;

    assert_eq!(path, target);
    assert_eq!(read_parquet(&target)?.num_rows(), 2);
    Ok(())
}

#[test]
fn test_filter_is_idempotent() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("people.csv");
    std::fs::write(&source, "id,age\n1,80\n2,8\n3,19\n4,18\n")?;
    let table = CsvReader::new(&source).read()?;

    let once = AdultFilter.transform(table)?;
    let twice = AdultFilter.transform(once.clone())?;

    assert_eq!(once, twice);
    assert_eq!(once.num_rows(), 2);
    Ok(())
}
