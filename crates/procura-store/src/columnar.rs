//! Parquet output: one file per year and language.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use procura_core::{Contract, Language};
use tracing::info;

use crate::{ContractSink, StoreError, contracts_to_batch};

/// Buffers records and writes `contracts_<year>_<lang>.parquet` files on
/// [`finish`](ContractSink::finish). Finishing after each year keeps only
/// that year's records buffered.
#[derive(Debug)]
pub struct ParquetSink {
    dir: PathBuf,
    buffers: BTreeMap<(i32, Language), Vec<Contract>>,
}

impl ParquetSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            buffers: BTreeMap::new(),
        }
    }

    pub fn file_path(&self, year: i32, language: Language) -> PathBuf {
        self.dir.join(format!("contracts_{year}_{language}.parquet"))
    }
}

impl ContractSink for ParquetSink {
    fn write(&mut self, contract: &Contract) -> Result<(), StoreError> {
        self.buffers
            .entry((contract.year, contract.language))
            .or_default()
            .push(contract.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        if self.buffers.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)?;
        for ((year, language), contracts) in std::mem::take(&mut self.buffers) {
            let path = self.file_path(year, language);
            let batch = contracts_to_batch(&contracts)?;
            write_parquet(&path, &batch)?;
            info!(year, %language, rows = batch.num_rows(), path = %path.display(), "wrote parquet");
        }
        Ok(())
    }
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use tempfile::TempDir;

    fn contract(id: &str, year: i32, language: Language) -> Contract {
        let mut c = Contract::new(id, year, language);
        c.title = format!("Contrato {id}");
        c
    }

    #[test]
    fn one_file_per_year_and_language() {
        let dir = TempDir::new().unwrap();
        let mut sink = ParquetSink::new(dir.path().join("parquet"));
        for c in [
            contract("1", 2020, Language::Es),
            contract("1", 2020, Language::Eu),
            contract("2", 2020, Language::Es),
            contract("3", 2021, Language::Es),
        ] {
            sink.write(&c).unwrap();
        }
        sink.finish().unwrap();

        let es_2020 = read_parquet(&sink.file_path(2020, Language::Es)).unwrap();
        let rows: usize = es_2020.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 2);
        let titles = es_2020[0].column_by_name("title").unwrap().as_string::<i32>();
        assert_eq!(titles.value(0), "Contrato 1");

        assert!(sink.file_path(2020, Language::Eu).is_file());
        assert!(sink.file_path(2021, Language::Es).is_file());
        assert!(!sink.file_path(2021, Language::Eu).exists());
    }

    #[test]
    fn finishing_per_year_drains_the_buffer() {
        let dir = TempDir::new().unwrap();
        let mut sink = ParquetSink::new(dir.path().join("parquet"));
        sink.write(&contract("1", 2020, Language::Es)).unwrap();
        sink.finish().unwrap();
        assert!(sink.buffers.is_empty());

        sink.write(&contract("2", 2021, Language::Es)).unwrap();
        sink.finish().unwrap();
        assert!(sink.buffers.is_empty());

        for year in [2020, 2021] {
            let rows: usize = read_parquet(&sink.file_path(year, Language::Es))
                .unwrap()
                .iter()
                .map(RecordBatch::num_rows)
                .sum();
            assert_eq!(rows, 1);
        }
    }

    #[test]
    fn finish_without_records_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut sink = ParquetSink::new(dir.path().join("parquet"));
        sink.finish().unwrap();
        assert!(!dir.path().join("parquet").exists());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_parquet(&dir.path().join("none.parquet")).unwrap_err();
        assert!(matches!(err, StoreError::ParquetNotFound(_)));
    }
}
