use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use log::{debug, info};
use std::io::{Error as IOError, ErrorKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_tar::Archive;

use crate::{config::ExtractConfig, error::Error};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Result of scanning one layer for its single target file.
#[derive(Debug)]
pub enum ExtractionOutcome
{
    Extracted
    {
        file_name: String,
        content: Vec<u8>,
    },
    /// More than one entry qualified
    Ambiguous,
    NotFound,
    Failed(Error),
}

async fn expect_magic<R: AsyncRead + Unpin>(reader: &mut BufReader<R>, magic: &[u8], format: &str) -> Result<(), Error>
{
    let head = reader.fill_buf().await.map_err(Error::Decompression)?;

    // a short first chunk is left for the decoder to judge
    let plausible = !head.is_empty()
        && (head.starts_with(magic) || magic.starts_with(head));

    if !plausible {
        return Err(Error::Decompression(IOError::new(
            ErrorKind::InvalidData,
            format!("layer stream is not {format} compressed"),
        )));
    }

    Ok(())
}

/// Wraps a blob in the decompressor its media type asks for.
pub async fn get_layer_reader<R: AsyncRead + Send + Unpin + 'static>(
    blob: R,
    media_type: &str,
    config: &ExtractConfig,
) -> Result<Box<dyn AsyncRead + Send + Unpin>, Error>
{
    let mut reader = BufReader::new(blob);

    if media_type.contains(config.gzip_marker.as_str()) {
        debug!("Detected gzip compressed layer, decompressing");
        expect_magic(&mut reader, GZIP_MAGIC, "gzip").await?;
        let mut decoder = GzipDecoder::new(reader);
        decoder.multiple_members(true);
        return Ok(Box::new(decoder));
    }

    if media_type.contains(config.zstd_marker.as_str()) {
        debug!("Detected zstd compressed layer, decompressing");
        expect_magic(&mut reader, ZSTD_MAGIC, "zstd").await?;
        return Ok(Box::new(ZstdDecoder::new(reader)));
    }

    Ok(Box::new(reader))
}

async fn find_single_entry<R: AsyncRead + Send + Unpin>(reader: R, suffix: &str) -> Result<ExtractionOutcome, Error>
{
    let mut archive = Archive::new(reader);
    let mut entries = archive.entries().map_err(Error::ArchiveParse)?;

    let mut found: Option<(String, Vec<u8>)> = None;

    while let Some(entry) = entries.next().await {
        let mut entry = entry.map_err(Error::ArchiveParse)?;

        let name = entry
            .path()
            .map_err(Error::ArchiveParse)?
            .to_string_lossy()
            .into_owned();
        let size = entry.header().size().map_err(Error::ArchiveParse)?;

        debug!("Found entry in archive: {} (size: {} bytes)", name, size);

        if !(entry.header().entry_type().is_file() && name.ends_with(suffix)) {
            // entries are laid out back to back, skip to the next header
            tokio::io::copy(&mut entry, &mut tokio::io::sink())
                .await
                .map_err(Error::ArchiveParse)?;
            continue;
        }

        if found.is_some() {
            info!("Found multiple {} files, second one: {}", suffix, name);
            return Ok(ExtractionOutcome::Ambiguous);
        }

        let mut content = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
        entry.read_to_end(&mut content).await.map_err(Error::ArchiveParse)?;

        if content.len() as u64 != size {
            return Err(Error::ArchiveParse(IOError::new(
                ErrorKind::UnexpectedEof,
                format!("entry {} truncated: {} of {} bytes", name, content.len(), size),
            )));
        }

        found = Some((name, content));
    }

    Ok(match found {
        Some((file_name, content)) => ExtractionOutcome::Extracted { file_name, content },
        None => ExtractionOutcome::NotFound,
    })
}

/// Scans a layer blob for exactly one regular file ending in the configured suffix.
///
/// The blob is consumed and dropped before returning, on every outcome. Scanning
/// stops at the second qualifying entry without reading the rest of the stream.
pub async fn scan_layer<R: AsyncRead + Send + Unpin + 'static>(
    blob: R,
    media_type: &str,
    config: &ExtractConfig,
) -> ExtractionOutcome
{
    let reader = match get_layer_reader(blob, media_type, config).await {
        Ok(reader) => reader,
        Err(e) => return ExtractionOutcome::Failed(e),
    };

    match find_single_entry(reader, &config.file_suffix).await {
        Ok(outcome) => outcome,
        Err(e) => ExtractionOutcome::Failed(e),
    }
}
