//! Exporters writing data points to a byte stream or a file.
//!
//! Binary framing, one frame per data point, lengths little-endian:
//!
//! ```text
//! u8 segment count | (u16 len | segment)* | u32 payload len | payload
//! ```
//!
//! The payload is the data point as collected: timestamp then metric bytes.

use crate::core::config::ExporterConfig;
use crate::core::{Result, TallyError};
use crate::export::json::data_point_to_json;
use crate::export::ExportFormat;
use crate::time_series::data_point::DataPoint;
use crate::time_series::exporter::Exporter;
use crate::time_series::types::{Aggregate, TIME_BYTES};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes each received data point to `W`.
#[derive(Debug)]
pub struct StreamExporter<W: Write> {
    writer: W,
    format: ExportFormat,
    pretty: bool,
    slim: bool,
    written: u64,
}

impl<W: Write> StreamExporter<W> {
    pub fn new(writer: W, format: ExportFormat) -> Self {
        Self {
            writer,
            format,
            pretty: false,
            slim: false,
            written: 0,
        }
    }

    pub fn from_config(writer: W, config: &ExporterConfig) -> Self {
        Self::new(writer, config.format).with_pretty(config.pretty_json)
    }

    /// Pretty-print JSON documents
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Render metrics as a plain name -> value map
    pub fn with_slim(mut self, slim: bool) -> Self {
        self.slim = slim;
        self
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Data points written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_point(&mut self, point: &DataPoint) -> Result<()> {
        match self.format {
            ExportFormat::Json => {
                let doc = data_point_to_json(point, self.slim);
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, &doc)?;
                } else {
                    serde_json::to_writer(&mut self.writer, &doc)?;
                }
                self.writer.write_all(b"\n")?;
            },
            ExportFormat::Binary => write_frame(&mut self.writer, point)?,
        }
        Ok(())
    }
}

impl<W: Write> Exporter for StreamExporter<W> {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        for point in batch {
            self.write_point(point)?;
        }
        self.writer.flush()?;
        self.written += batch.len() as u64;
        tracing::trace!(points = batch.len(), format = ?self.format, "Wrote data points");
        Ok(())
    }
}

/// Encode one binary frame.
pub fn write_frame<W: Write>(writer: &mut W, point: &DataPoint) -> Result<()> {
    let segments = point.aggregate().segments();
    let count = u8::try_from(segments.len()).map_err(|_| {
        TallyError::malformed(format!("too many aggregate segments: {}", segments.len()))
    })?;
    writer.write_all(&[count])?;
    for segment in segments {
        let len = u16::try_from(segment.len())
            .map_err(|_| TallyError::malformed("aggregate segment longer than 65535 bytes"))?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(segment.as_bytes())?;
    }
    let payload = point.payload();
    let len = u32::try_from(payload.len())
        .map_err(|_| TallyError::malformed("data point payload larger than 4 GiB"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Decode a buffer of binary frames. Aggregates are rebuilt with
/// `delimiter` joining their segments.
pub fn read_frames(mut data: &[u8], delimiter: char) -> Result<Vec<DataPoint>> {
    fn take<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
        if data.len() < n {
            return Err(TallyError::Truncated {
                needed: n,
                available: data.len(),
            });
        }
        let (head, rest) = data.split_at(n);
        *data = rest;
        Ok(head)
    }

    let mut points = Vec::new();
    while !data.is_empty() {
        let count = take(&mut data, 1)?[0];
        let mut segments = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let b = take(&mut data, 2)?;
            let len = usize::from(u16::from_le_bytes([b[0], b[1]]));
            let bytes = take(&mut data, len)?;
            let segment = std::str::from_utf8(bytes).map_err(|e| {
                TallyError::malformed(format!("aggregate segment is not UTF-8: {e}"))
            })?;
            segments.push(segment.to_string());
        }
        let b = take(&mut data, 4)?;
        let len = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize;
        if len < TIME_BYTES {
            return Err(TallyError::malformed(format!("payload of {len} bytes has no timestamp")));
        }
        let payload = take(&mut data, len)?.to_vec();
        let aggregate = Arc::new(Aggregate::from_segments(segments, delimiter));
        points.push(DataPoint::from_payload(aggregate, payload));
    }
    Ok(points)
}

/// Appends data points to a file, creating it if needed.
#[derive(Debug)]
pub struct FileExporter {
    path: PathBuf,
    inner: StreamExporter<BufWriter<File>>,
}

impl FileExporter {
    pub fn open(path: impl AsRef<Path>, format: ExportFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), ?format, "Opened file exporter");
        Ok(Self {
            path,
            inner: StreamExporter::new(BufWriter::new(file), format),
        })
    }

    /// Open the file named by `config.output`.
    pub fn from_config(config: &ExporterConfig) -> Result<Self> {
        let path = config
            .output
            .as_ref()
            .ok_or_else(|| TallyError::config("exporter.output is not set"))?;
        let mut exporter = Self::open(path, config.format)?;
        exporter.inner.pretty = config.pretty_json;
        Ok(exporter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.inner.written()
    }
}

impl Exporter for FileExporter {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        self.inner.receive_data_points(batch)
    }
}
