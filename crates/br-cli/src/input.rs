//! Opening dump files, transparently unwrapping gzip and zip archives.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use zip::ZipArchive;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Opens `path` for reading; `-` means stdin.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let raw: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(path).with_context(|| format!("failed to open {}", path.display()))?)
    };
    let mut reader = BufReader::new(raw);
    let magic = reader.fill_buf().context("failed to read input")?;

    if magic.starts_with(GZIP_MAGIC) {
        tracing::debug!(path = %path.display(), "reading gzip input");
        return Ok(Box::new(BufReader::new(GzDecoder::new(reader))));
    }
    if magic.starts_with(ZIP_MAGIC) {
        tracing::debug!(path = %path.display(), "reading zip input");
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let content = read_zip_entry(bytes)
            .with_context(|| format!("failed to unpack {}", path.display()))?;
        return Ok(Box::new(Cursor::new(content)));
    }
    Ok(Box::new(reader))
}

/// Contents of the first `.txt` entry, or of the first file if none.
fn read_zip_entry(bytes: Vec<u8>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut first_file = None;
    let mut first_text = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.is_file() {
            continue;
        }
        if first_file.is_none() {
            first_file = Some(index);
        }
        if entry.name().ends_with(".txt") {
            first_text = Some(index);
            break;
        }
    }

    let index = first_text
        .or(first_file)
        .context("archive contains no files")?;
    let mut entry = archive.by_index(index)?;
    tracing::debug!(entry = entry.name(), "using archive entry");
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}

/// Base name of a dump file without its compression and text extensions.
pub fn dump_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name == "-" {
        return None;
    }
    let mut stem = name;
    for ext in [".gz", ".zip", ".txt"] {
        stem = stem.strip_suffix(ext).unwrap_or(stem);
    }
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use zip::write::SimpleFileOptions;

    fn read_all(mut reader: Box<dyn BufRead>) -> String {
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn plain_file_is_read_as_is() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dump.txt");
        std::fs::write(&path, "hello\n").unwrap();

        assert_eq!(read_all(open(&path).unwrap()), "hello\n");
    }

    #[test]
    fn gzip_is_unwrapped() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dump.txt.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        assert_eq!(read_all(open(&path).unwrap()), "compressed\n");
    }

    #[test]
    fn zip_prefers_text_entry() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dump.zip");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        writer.start_file("version.bin", options).unwrap();
        writer.write_all(b"1").unwrap();
        writer.start_file("bugreport.txt", options).unwrap();
        writer.write_all(b"report\n").unwrap();
        writer.finish().unwrap();

        assert_eq!(read_all(open(&path).unwrap()), "report\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = open(&temp.path().join("nope.txt")).err().unwrap();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn stem_drops_known_extensions() {
        assert_eq!(
            dump_stem(Path::new("/tmp/bugreport-foo.txt.gz")).as_deref(),
            Some("bugreport-foo")
        );
        assert_eq!(dump_stem(Path::new("crash.zip")).as_deref(), Some("crash"));
        assert_eq!(dump_stem(Path::new("-")), None);
    }
}
