use super::evolution_engine::{EvolutionResult, GenerationRecord};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Append-only destination for generation records and the final result.
pub trait ResultSink: Send {
    fn record_generation(&mut self, record: &GenerationRecord) -> Result<()>;
    fn record_result(&mut self, result: &EvolutionResult) -> Result<()>;
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub generations: Vec<GenerationRecord>,
    pub result: Option<EvolutionResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn record_generation(&mut self, record: &GenerationRecord) -> Result<()> {
        self.generations.push(record.clone());
        Ok(())
    }

    fn record_result(&mut self, result: &EvolutionResult) -> Result<()> {
        self.result = Some(result.clone());
        Ok(())
    }
}

/// One line of a JSON-lines result file, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkEntry {
    Generation(GenerationRecord),
    Result(EvolutionResult),
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SinkLine<'a> {
    Generation(&'a GenerationRecord),
    Result(&'a EvolutionResult),
}

/// Writes one JSON object per line and flushes after each, so a crashed run
/// leaves every completed generation on disk.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Append to `path`, creating the file and its parent directory if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &SinkLine<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn record_generation(&mut self, record: &GenerationRecord) -> Result<()> {
        self.write_line(&SinkLine::Generation(record))
    }

    fn record_result(&mut self, result: &EvolutionResult) -> Result<()> {
        self.write_line(&SinkLine::Result(result))
    }
}

/// Read back a file written by `JsonLinesSink`, skipping blank lines.
pub fn read_json_lines<P: AsRef<Path>>(path: P) -> Result<Vec<SinkEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
