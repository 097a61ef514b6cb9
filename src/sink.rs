use anyhow::Result;
use std::io::Write;

use crate::models::FileRecord;

/// Downstream consumer of discovered files
pub trait RecordSink {
    fn add_file(&mut self, record: FileRecord) -> Result<()>;

    /// Called once after the last record of a successful scan
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<FileRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn add_file(&mut self, record: FileRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn add_file(&mut self, record: FileRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes bare paths, one per line
pub struct PathListSink<W: Write> {
    writer: W,
}

impl<W: Write> PathListSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for PathListSink<W> {
    fn add_file(&mut self, record: FileRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.path)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
