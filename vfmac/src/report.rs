// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Where resolved reports go.

use args::OutputFormat;
use sriov::MacReport;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors which may occur while publishing a report.
#[derive(Debug, thiserror::Error)]
pub enum SinkErr {
    /// Writing to the destination failed.
    #[error("unable to write report: {0}")]
    Io(#[from] std::io::Error),
    /// The report could not be rendered as JSON.
    #[error("unable to render report as json: {0}")]
    Json(#[from] serde_json::Error),
    /// The report could not be rendered as YAML.
    #[error("unable to render report as yaml: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// A consumer of finished reports.
///
/// The resolver knows nothing about where its output ends up; anything which can take a whole
/// [`MacReport`] can be a sink.
pub trait ReportSink {
    /// Hand over a complete report.
    ///
    /// # Errors
    ///
    /// If the report could not be delivered.
    fn publish(&mut self, report: &MacReport) -> Result<(), SinkErr>;
}

/// Renders reports onto a [`Write`], e.g. stdout.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        WriterSink { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn publish(&mut self, report: &MacReport) -> Result<(), SinkErr> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, report)?;
                self.writer.write_all(b"\n")?;
            }
            OutputFormat::Yaml => serde_yaml_ng::to_writer(&mut self.writer, report)?,
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Replaces the file at a path with each published report.
///
/// Nothing touches the destination until a report is fully rendered. The report is written
/// next to the destination and renamed over it, so readers see either the previous report or
/// the new one, never a partial file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        FileSink {
            path: path.into(),
            format,
        }
    }

    fn staging_path(&self) -> Result<PathBuf, SinkErr> {
        let Some(name) = self.path.file_name() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} does not name a file", self.path.display()),
            )
            .into());
        };
        let mut staging = std::ffi::OsString::from(".");
        staging.push(name);
        staging.push(".tmp");
        Ok(self.path.with_file_name(staging))
    }
}

impl ReportSink for FileSink {
    fn publish(&mut self, report: &MacReport) -> Result<(), SinkErr> {
        let mut rendered = WriterSink::new(vec![], self.format);
        rendered.publish(report)?;
        let staging = self.staging_path()?;
        debug!("staging {} report in {}", self.format, staging.display());
        if let Err(err) = std::fs::write(&staging, rendered.into_inner())
            .and_then(|()| std::fs::rename(&staging, &self.path))
        {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                debug!("unable to remove {}: {cleanup}", staging.display());
            }
            return Err(err.into());
        }
        Ok(())
    }
}

/// The sink selected on the command line: the file at `path`, or stdout.
pub fn sink_for(path: Option<&Path>, format: OutputFormat) -> Box<dyn ReportSink> {
    match path {
        Some(path) => Box::new(FileSink::new(path, format)),
        None => Box::new(WriterSink::new(std::io::stdout().lock(), format)),
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn publish(&mut self, report: &MacReport) -> Result<(), SinkErr> {
        (**self).publish(report)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSink, ReportSink, WriterSink};
    use args::OutputFormat;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use sriov::{Device, Mac, MacReport, ResourceGroup, VfPciAddress};

    fn report() -> MacReport {
        MacReport {
            name: "vf-macs".to_string(),
            resources: vec![ResourceGroup {
                name: "res".to_string(),
                devices: vec![Device {
                    pci: VfPciAddress::try_from("0000:01:00.1").unwrap(),
                    mac: Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]),
                }],
            }],
        }
    }

    #[test]
    fn json() {
        let mut sink = WriterSink::new(vec![], OutputFormat::Json);
        sink.publish(&report()).unwrap();
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert!(written.ends_with('\n'));
        let back: MacReport = serde_json::from_str(&written).unwrap();
        assert_eq!(back, report());
        assert!(written.contains("\"mac\": \"aa:bb:cc:dd:ee:01\""));
    }

    #[test]
    fn yaml() {
        let mut sink = WriterSink::new(vec![], OutputFormat::Yaml);
        sink.publish(&report()).unwrap();
        let written = String::from_utf8(sink.into_inner()).unwrap();
        let back: MacReport = serde_yaml_ng::from_str(&written).unwrap();
        assert_eq!(back, report());
        assert!(written.contains("name: vf-macs"));
    }

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vfmac-{}-{test}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_sink_replaces_the_previous_report() {
        let dir = scratch_dir("replace");
        let path = dir.join("report.json");
        std::fs::write(&path, "{\"previous\":\"report\"}").unwrap();
        FileSink::new(&path, OutputFormat::Json)
            .publish(&report())
            .unwrap();
        let back: MacReport = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, report());
        // only the report itself is left behind
        let entries: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["report.json"]);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_sink_keeps_the_previous_report_when_it_can_not_write() {
        let dir = scratch_dir("unwritable");
        let path = dir.join("report.json");
        std::fs::write(&path, "previous").unwrap();
        // a directory squatting on the staging name makes the write fail
        std::fs::create_dir_all(dir.join(".report.json.tmp")).unwrap();
        assert!(
            FileSink::new(&path, OutputFormat::Json)
                .publish(&report())
                .is_err()
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_sink_needs_a_file_name() {
        let mut sink = FileSink::new("/", OutputFormat::Yaml);
        assert!(sink.publish(&report()).is_err());
    }
}
