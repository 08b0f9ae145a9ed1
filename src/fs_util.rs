use std::fs;
use std::io::Read;
use std::path::Path;

use camino::{Utf8Component, Utf8Path};
use flate2::read::GzDecoder;

use crate::error::KiraError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

pub fn decode_gz(bytes: &[u8]) -> Result<String, KiraError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|err| KiraError::Filesystem(format!("gunzip: {err}")))?;
    Ok(text)
}

pub fn read_source_text(path: &Path) -> Result<String, KiraError> {
    let bytes = fs::read(path)
        .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    if is_gzip(&bytes) {
        return decode_gz(&bytes);
    }
    String::from_utf8(bytes)
        .map_err(|err| KiraError::Filesystem(format!("{} is not UTF-8: {err}", path.display())))
}

pub fn enclosed_path(name: &str) -> Result<&Utf8Path, KiraError> {
    let path = Utf8Path::new(name);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
        )
    });
    if name.is_empty() || escapes {
        return Err(KiraError::Filesystem(format!(
            "path traversal detected: {name}"
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn escaping_names_are_rejected() {
        assert!(enclosed_path("f1/a.FPKM.txt.gz").is_ok());
        for name in ["", "../a.txt", "f1/../../a.txt", "/etc/passwd"] {
            assert!(enclosed_path(name).is_err(), "{name}");
        }
    }

    #[test]
    fn gzip_and_plain_files_read_the_same() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, "Gene\tFPKM\n").unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Gene\tFPKM\n").unwrap();
        let packed = dir.path().join("packed.txt.gz");
        fs::write(&packed, encoder.finish().unwrap()).unwrap();

        assert_eq!(
            read_source_text(&plain).unwrap(),
            read_source_text(&packed).unwrap()
        );
    }
}
