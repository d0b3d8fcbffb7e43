use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use glf_core::records::GenericPayload;
use glf_core::{Record, RecordBody};
use glf_store::{
    BuildMode, Cli, Command, GlfError, IndexHandle, LogReader, LogWriter, PlaybackRecord,
    ReadMode, SequentialReader, WriterConfig,
};
use log::{info, warn};
use serde::Serialize;

const MIB: u64 = 1024 * 1024;

/// How long `dump --mode async` waits for the index to catch up
const INDEX_WAIT: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match cli.command {
        Command::Dump { mode, files } => dump(mode, files),
        Command::Index { json, files } => index(json, files),
        Command::Relog {
            output,
            max_size_mb,
            config,
            files,
        } => relog(output, max_size_mb, config, files),
    }
}

fn dump(mode: ReadMode, files: Vec<PathBuf>) -> anyhow::Result<()> {
    match mode {
        ReadMode::Fast => {
            let mut position = 0;
            for path in &files {
                let reader = SequentialReader::open(path)
                    .with_context(|| format!("Cannot open {}", path.display()))?;
                for result in reader {
                    match result {
                        Ok(record) => println!("{}", describe(position, &record)),
                        Err(e) => {
                            warn!("{}: stopped after {} records: {}", path.display(), position, e);
                            break;
                        }
                    }
                    position += 1;
                }
            }
        }
        ReadMode::Sync => {
            let mut reader = LogReader::open(files, BuildMode::Synchronous)?;
            for position in 0..reader.record_count() {
                match reader.get_record(position) {
                    Ok(record) => println!("{}", describe(position, &record)),
                    Err(e) => warn!("Record {}: {}", position, e),
                }
            }
        }
        ReadMode::Async => {
            let mut reader = LogReader::open(files, BuildMode::Asynchronous)?;
            let mut position = 0;
            loop {
                match reader.wait_record(position, INDEX_WAIT) {
                    Ok(record) => println!("{}", describe(position, &record)),
                    Err(GlfError::DataNotAvailable) => break,
                    Err(GlfError::StillBuildingIndex) => {
                        info!("Waiting for index ({} records so far)", reader.record_count());
                        continue;
                    }
                    Err(e) => warn!("Record {}: {}", position, e),
                }
                position += 1;
            }
        }
    }
    Ok(())
}

fn describe(position: usize, playback: &PlaybackRecord) -> String {
    let record = &playback.record;
    let kind = match record.kind() {
        Some(kind) => format!("{:?}", kind),
        None => format!("type {}", record.header.data_type),
    };
    format!(
        "{:>8} {:>17.3} frame {:>6} +{:>5}ms dev {:>5} node {:>3} {:<12} {}",
        position,
        record.header.timestamp,
        playback.frame,
        playback.interval_ms,
        record.header.device_id,
        record.header.node_id,
        kind,
        body_summary(record)
    )
}

fn body_summary(record: &Record) -> String {
    match &record.body {
        RecordBody::Image(image) => format!(
            "{} beams x {} lines{}",
            image.main.beam_count(),
            image.main.geometry.range_lines(),
            if image.has_zoom() { ", zoom" } else { "" }
        ),
        RecordBody::Generic(generic) => {
            let payload = match record.generic_payload() {
                Some(Ok(GenericPayload::Ascii(text))) => {
                    String::from_utf8_lossy(text).trim_end().to_string()
                }
                Some(Ok(GenericPayload::Gps(fix))) => {
                    format!("{:.6} {:.6} from {}", fix.latitude, fix.longitude, fix.source())
                }
                Some(Ok(GenericPayload::Compass(fix))) => {
                    format!("heading {:.1} from {}", fix.heading, fix.source())
                }
                Some(Ok(GenericPayload::Opaque(data))) => format!("{} bytes", data.len()),
                Some(Err(e)) => format!("<{}>", e),
                None => String::new(),
            };
            match generic.message_type() {
                Some(msg) => format!("{:?}: {}", msg, payload),
                None => format!("msg {}: {}", generic.msg_type, payload),
            }
        }
        RecordBody::Compressed(blob) => {
            format!("{:?}, {} bytes", blob.compression, blob.data.len())
        }
        RecordBody::Status(status) => format!("status v{}", status.version),
        RecordBody::Points(points) => format!("{} values", points.points.len()),
        RecordBody::Unknown(body) => format!("{} bytes", body.len()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexSummary {
    record_count: usize,
    files: Vec<FileSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileSummary {
    path: PathBuf,
    start_position: usize,
}

fn index(json: bool, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let index = IndexHandle::build(files, BuildMode::Synchronous)?;

    let mut summary = IndexSummary {
        record_count: index.record_count(),
        files: Vec::new(),
    };
    for (i, path) in index.files().iter().enumerate() {
        summary.files.push(FileSummary {
            path: path.clone(),
            start_position: index.file_start_position(i)?,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} records in {} files", summary.record_count, summary.files.len());
        for file in &summary.files {
            println!("{:>8} {}", file.start_position, file.path.display());
        }
    }
    Ok(())
}

fn relog(
    output: PathBuf,
    max_size_mb: Option<u64>,
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => WriterConfig::from_json_file(&path)
            .with_context(|| format!("Cannot load writer config {}", path.display()))?,
        None => WriterConfig::default(),
    };
    config.directory = output;
    if let Some(mb) = max_size_mb {
        if mb == 0 {
            bail!("--max-size-mb must be at least 1");
        }
        config.max_file_size_bytes = mb * MIB;
    }

    let mut reader = LogReader::open(files, BuildMode::Synchronous)?;
    let mut writer = LogWriter::with_config(config)?;

    let mut copied = 0;
    for position in 0..reader.record_count() {
        match reader.get_record(position) {
            Ok(playback) => {
                writer.append(&playback.record)?;
                copied += 1;
            }
            Err(e) => warn!("Skipping record {}: {}", position, e),
        }
    }
    let stats = writer.stats();
    writer.close()?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    println!(
        "Copied {} records into {} files",
        copied,
        writer.written_files().len()
    );
    Ok(())
}
