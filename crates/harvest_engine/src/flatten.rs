use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;

use catalog_logging::{catalog_error, catalog_info, catalog_warn};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::json_stream::for_each_array_item;
use crate::persist::{ensure_output_dir, PersistError};
use crate::product::{extract_row, ProductRow, CSV_HEADERS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenSettings {
    /// Every `*.json` and `*.json.gz` in this directory, in path order.
    pub input_dir: PathBuf,
    /// Overrides `input_dir` when set.
    pub input_file: Option<PathBuf>,
    pub language: String,
    pub output_dir: PathBuf,
    pub chunk_rows: usize,
    pub progress_every: u64,
}

impl Default for FlattenSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("output"),
            input_file: None,
            language: "en".to_string(),
            output_dir: PathBuf::from("csv"),
            chunk_rows: 50_000,
            progress_every: 100_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("no JSON input files found in {0:?}")]
    NoInput(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlattenSummary {
    pub files_read: usize,
    pub files_failed: usize,
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub csv_files: Vec<PathBuf>,
}

/// Input files for a flattening run, sorted by path.
pub fn discover_inputs(settings: &FlattenSettings) -> Result<Vec<PathBuf>, FlattenError> {
    if let Some(file) = &settings.input_file {
        return Ok(vec![file.clone()]);
    }
    let dir = &settings.input_dir;
    if !dir.is_dir() {
        return Err(FlattenError::NoInput(dir.clone()));
    }
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|path| is_json_export(path))
        .collect();
    inputs.sort();
    if inputs.is_empty() {
        return Err(FlattenError::NoInput(dir.clone()));
    }
    Ok(inputs)
}

fn is_json_export(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    (name.ends_with(".json") || name.ends_with(".json.gz")) && !name.ends_with(".checkpoint.json")
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    let gzipped = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if gzipped {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Stream every product of every input into chunked CSV files.
///
/// A product that cannot be flattened is logged and skipped; an input that
/// cannot be read is logged and the next one is processed. Only CSV output
/// failures stop the run.
pub fn flatten(settings: &FlattenSettings) -> Result<FlattenSummary, FlattenError> {
    let inputs = discover_inputs(settings)?;
    ensure_output_dir(&settings.output_dir)?;
    catalog_info!(
        "flattening {} files into {:?}",
        inputs.len(),
        settings.output_dir
    );

    let started = Instant::now();
    let progress_every = settings.progress_every.max(1);
    let mut csv = CsvChunks::new(&settings.output_dir, &settings.language, settings.chunk_rows);
    let mut summary = FlattenSummary::default();

    for (position, path) in inputs.iter().enumerate() {
        catalog_info!("file [{}/{}]: {:?}", position + 1, inputs.len(), path);
        let reader = match open_input(path) {
            Ok(reader) => reader,
            Err(err) => {
                catalog_error!("cannot open {:?}: {}", path, err);
                summary.files_failed += 1;
                continue;
            }
        };

        let mut fatal = None;
        let streamed = for_each_array_item(reader, |product| {
            let row = match extract_row(&product, &settings.language) {
                Ok(row) => row,
                Err(err) => {
                    catalog_warn!("skipping product: {}", err);
                    summary.rows_skipped += 1;
                    return ControlFlow::Continue(());
                }
            };
            if let Err(err) = csv.write(&row) {
                fatal = Some(err);
                return ControlFlow::Break(());
            }
            summary.rows_written += 1;
            if summary.rows_written % progress_every == 0 {
                catalog_info!(
                    "progress: {} rows | {:.1} min",
                    summary.rows_written,
                    started.elapsed().as_secs_f64() / 60.0
                );
            }
            ControlFlow::Continue(())
        });

        if let Some(err) = fatal {
            return Err(err);
        }
        match streamed {
            Ok(_) => summary.files_read += 1,
            Err(err) => {
                catalog_error!("malformed input {:?}: {}", path, err);
                summary.files_failed += 1;
            }
        }
    }

    summary.csv_files = csv.finish()?;
    catalog_info!(
        "flatten done | {} rows in {} csv files | {:.2} min",
        summary.rows_written,
        summary.csv_files.len(),
        started.elapsed().as_secs_f64() / 60.0
    );
    Ok(summary)
}

struct OpenChunk {
    writer: csv::Writer<NamedTempFile>,
    target: PathBuf,
    rows: usize,
}

/// Rotating `<lang>_part_<NNNNN>.csv` output; each file is published by
/// rename once complete and carries its own header.
struct CsvChunks {
    dir: PathBuf,
    language: String,
    chunk_rows: usize,
    next_index: u32,
    current: Option<OpenChunk>,
    written: Vec<PathBuf>,
}

impl CsvChunks {
    fn new(dir: &Path, language: &str, chunk_rows: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            language: language.to_string(),
            chunk_rows: chunk_rows.max(1),
            next_index: 1,
            current: None,
            written: Vec::new(),
        }
    }

    fn write(&mut self, row: &ProductRow) -> Result<(), FlattenError> {
        let chunk = match self.current.take() {
            Some(chunk) => chunk,
            None => self.open()?,
        };
        let chunk = self.current.insert(chunk);
        chunk.writer.write_record(row.fields())?;
        chunk.rows += 1;
        if chunk.rows >= self.chunk_rows {
            self.close()?;
        }
        Ok(())
    }

    fn open(&mut self) -> Result<OpenChunk, FlattenError> {
        let target = self
            .dir
            .join(format!("{}_part_{:05}.csv", self.language, self.next_index));
        self.next_index += 1;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(UTF8_BOM)?;
        let mut writer = csv::Writer::from_writer(tmp);
        writer.write_record(CSV_HEADERS)?;
        Ok(OpenChunk {
            writer,
            target,
            rows: 0,
        })
    }

    fn close(&mut self) -> Result<(), FlattenError> {
        let Some(chunk) = self.current.take() else {
            return Ok(());
        };
        let tmp = chunk
            .writer
            .into_inner()
            .map_err(|err| FlattenError::Io(err.into_error()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&chunk.target)
            .map_err(|err| PersistError::Io(err.error))?;
        catalog_info!("saved {} rows -> {:?}", chunk.rows, chunk.target);
        self.written.push(chunk.target);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<PathBuf>, FlattenError> {
        self.close()?;
        Ok(self.written)
    }
}
