use std::time::Duration;

use crate::{file_util, result::CvError, types::ResultImage};

/// Resolves a source ref of an image to pixel data. Implementations block, the
/// session model is synchronous.
pub trait ReadPixels {
    fn read(&self, src: &str) -> ResultImage;
}

#[derive(Clone, Debug, Default)]
pub struct LocalPixelReader;

impl ReadPixels for LocalPixelReader {
    fn read(&self, path: &str) -> ResultImage {
        image::io::Reader::open(path)
            .map_err(|e| CvError::source_unavailable(&format!("cannot open {path:?}, {e}")))?
            .with_guessed_format()
            .map_err(|e| CvError::source_unavailable(&format!("cannot read {path:?}, {e}")))?
            .decode()
            .map_err(|e| CvError::source_unavailable(&format!("could not decode {path:?}, {e}")))
    }
}

#[derive(Clone, Debug)]
pub struct HttpPixelReader {
    timeout: Duration,
}

impl HttpPixelReader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ReadPixels for HttpPixelReader {
    fn read(&self, url: &str) -> ResultImage {
        let url = file_util::url_encode(url);
        let resp = || {
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()?
                .get(&url)
                .send()?
                .error_for_status()?
                .bytes()
        };
        let image_byte_blob = resp()
            .map_err(|e| CvError::source_unavailable(&format!("cannot fetch {url}, {e}")))?;
        image::load_from_memory(&image_byte_blob)
            .map_err(|e| CvError::source_unavailable(&format!("could not decode {url}, {e}")))
    }
}

/// Reads pixel data from a local path or, for http(s) refs, via a blocking
/// network fetch with the given timeout.
pub fn fetch_pixels(src: &str, http_timeout: Duration) -> ResultImage {
    if src.starts_with("http") {
        HttpPixelReader::new(http_timeout).read(src)
    } else {
        LocalPixelReader.read(src)
    }
}

#[cfg(test)]
use {
    crate::{defer_file_removal, file_util::DEFAULT_TMPDIR, result::CvErrorKind},
    image::{ImageBuffer, Rgb},
    std::fs,
};

#[test]
fn test_local_read() {
    fs::create_dir_all(DEFAULT_TMPDIR.clone()).unwrap();
    let path = DEFAULT_TMPDIR.join("reader-test.png");
    defer_file_removal!(&path);
    let im = ImageBuffer::from_pixel(4, 3, Rgb::<u8>([10, 20, 30]));
    im.save(&path).unwrap();
    let read = LocalPixelReader.read(path.to_str().unwrap()).unwrap();
    assert_eq!(read.width(), 4);
    assert_eq!(read.height(), 3);
}

#[test]
fn test_local_read_missing() {
    let err = fetch_pixels("/nowhere/img.png", Duration::from_secs(1)).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::SourceUnavailable);
}
