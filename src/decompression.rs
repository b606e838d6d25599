use anyhow::{anyhow, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

/// Compression detected from the first bytes of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Plain,
}

impl Compression {
    /// Gzip starts with 1F 8B 08, zstd with 28 B5 2F FD
    pub fn detect(head: &[u8]) -> Self {
        if head.len() >= 3 && head[..3] == [0x1F, 0x8B, 0x08] {
            Compression::Gzip
        } else if head.len() >= 4 && head[..4] == [0x28, 0xB5, 0x2F, 0xFD] {
            Compression::Zstd
        } else {
            Compression::Plain
        }
    }
}

/// Wrap a reader so gzip and zstd streams are decompressed transparently
pub fn maybe_decompress<R: Read + Send + 'static>(mut reader: R) -> Result<Box<dyn Read + Send>> {
    let mut head = [0u8; 4];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    // Put the peeked bytes back in front of the stream
    let chained = Cursor::new(head[..filled].to_vec()).chain(reader);

    Ok(match Compression::detect(&head[..filled]) {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::Plain => Box::new(chained),
    })
}

/// Open an input file for buffered line reading
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            return Err(anyhow!(
                "ZIP files are not supported, only gzip and zstd. Extract it first: unzip {}",
                path.display()
            ));
        }
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
    let reader = maybe_decompress(file)
        .with_context(|| format!("Failed to detect compression of '{}'", path.display()))?;
    Ok(Box::new(BufReader::new(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_all(path: &Path) -> String {
        let mut content = String::new();
        open_input(path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn detects_magic_bytes() {
        assert_eq!(Compression::detect(&[0x1F, 0x8B, 0x08, 0x00]), Compression::Gzip);
        assert_eq!(Compression::detect(&[0x28, 0xB5, 0x2F, 0xFD]), Compression::Zstd);
        assert_eq!(Compression::detect(b"plai"), Compression::Plain);
        assert_eq!(Compression::detect(b""), Compression::Plain);
    }

    #[test]
    fn plain_file_passthrough() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "line 1\nline 2\n").unwrap();
        assert_eq!(read_all(file.path()), "line 1\nline 2\n");
    }

    #[test]
    fn short_plain_file_is_not_truncated() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ab").unwrap();
        assert_eq!(read_all(file.path()), "ab");
    }

    #[test]
    fn gzip_file_is_decompressed() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"user login ok\nuser logout fail\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&compressed).unwrap();
        assert_eq!(read_all(file.path()), "user login ok\nuser logout fail\n");
    }

    #[test]
    fn zstd_file_is_decompressed() {
        let compressed = zstd::encode_all(&b"disk full on sda\n"[..], 0).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&compressed).unwrap();
        assert_eq!(read_all(file.path()), "disk full on sda\n");
    }

    #[test]
    fn zip_files_are_rejected() {
        let file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        let err = open_input(file.path()).err().unwrap();
        assert!(err.to_string().contains("ZIP files are not supported"));
    }
}
