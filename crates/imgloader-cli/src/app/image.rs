//! A decodable image that reads only as far as the header needs.
//!
//! The stream is read in chunks and the buffered prefix is parsed for a header
//! as it grows, so a large or endless stream is never read to its end.

use image::{ImageReader, ImageResult};
use imgloader::{BoxError, DecodableImage, ImageFactory, LoadEventSource, LoadEvents, LoadStatus};
use std::{cell::Cell, io::Cursor};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest stream prefix searched for an image header.
pub const MAX_HEADER_BYTES: usize = 4 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Reads the pixel dimensions from an encoded image without decoding the
/// pixel data. The format is guessed from the leading bytes.
pub fn read_dimensions(bytes: &[u8]) -> ImageResult<(u32, u32)> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok((width, height))
}

/// Image fed from any async byte stream.
///
/// Stops reading at the first prefix that yields dimensions. Reading the
/// stream can fail outright; a stream that ends, or passes
/// [`MAX_HEADER_BYTES`], without a supported header is reported as a
/// [`LoadStatus::Failed`] event.
#[derive(Debug, Default)]
pub struct HeaderImage {
    events: LoadEventSource,
    dimensions: Cell<(u32, u32)>,
}

impl<R> DecodableImage<R> for HeaderImage
where
    R: AsyncRead + Unpin,
{
    fn load_events(&self) -> LoadEvents {
        self.events.subscribe()
    }

    async fn set_source(&self, stream: &mut R) -> Result<(), BoxError> {
        self.events.emit(LoadStatus::Started);

        let mut bytes = Vec::new();
        let mut chunk = vec![0; READ_CHUNK];
        // Parse attempts double the prefix each time.
        let mut next_attempt = 0;

        let failure = loop {
            let n = stream.read(&mut chunk).await?;
            bytes.extend_from_slice(&chunk[..n]);

            let eof = n == 0;
            let exhausted = bytes.len() >= MAX_HEADER_BYTES;
            if !eof && !exhausted && bytes.len() < next_attempt {
                continue;
            }
            next_attempt = bytes.len().saturating_mul(2);
            self.events.emit(LoadStatus::Progress);

            match read_dimensions(&bytes) {
                Ok(dimensions) => {
                    self.dimensions.set(dimensions);
                    self.events.emit(LoadStatus::Ended);
                    return Ok(());
                }
                Err(e) if eof => break e.to_string(),
                Err(_) if exhausted => {
                    break format!("no image header in the first {MAX_HEADER_BYTES} bytes");
                }
                Err(_) => {}
            }
        };

        self.events.emit(LoadStatus::Failed(failure));
        Ok(())
    }

    fn pixel_width(&self) -> u32 {
        self.dimensions.get().0
    }

    fn pixel_height(&self) -> u32 {
        self.dimensions.get().1
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderImageFactory;

impl<R> ImageFactory<R> for HeaderImageFactory
where
    R: AsyncRead + Unpin,
{
    type Image = HeaderImage;

    fn create(&self) -> HeaderImage {
        HeaderImage::default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::time::Duration;
    use image::{ImageFormat, RgbaImage};
    use imgloader::LOAD_EVENTS_ENDED;
    use tokio::time::timeout;

    fn events_for<R: AsyncRead + Unpin>(image: &HeaderImage, _stream: &R) -> LoadEvents {
        DecodableImage::<R>::load_events(image)
    }

    /// Encodes a blank `width` x `height` PNG.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn reads_png_dimensions() {
        assert_eq!(read_dimensions(&png(10, 20)).unwrap(), (10, 20));
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(read_dimensions(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn emits_load_end_after_decoding() {
        let image = HeaderImage::default();
        let load_end = DecodableImage::<&[u8]>::load_events(&image).load_end();

        let bytes = png(3, 4);
        let mut stream = bytes.as_slice();
        image.set_source(&mut stream).await.unwrap();

        load_end.await.unwrap();
        assert_eq!(DecodableImage::<&[u8]>::pixel_width(&image), 3);
        assert_eq!(DecodableImage::<&[u8]>::pixel_height(&image), 4);
    }

    #[tokio::test]
    async fn emits_a_failed_event_for_garbage() {
        let image = HeaderImage::default();
        let load_end = DecodableImage::<&[u8]>::load_events(&image).load_end();

        let mut stream: &[u8] = b"GIF89a but not really";
        image.set_source(&mut stream).await.unwrap();

        let err = load_end.await.unwrap_err();
        assert_ne!(err.to_string(), LOAD_EVENTS_ENDED);
    }

    #[tokio::test]
    async fn stops_reading_once_the_header_is_found() {
        let image = HeaderImage::default();
        let bytes = png(3, 4);
        let mut stream = bytes.as_slice().chain(tokio::io::repeat(0));
        let load_end = events_for(&image, &stream).load_end();

        timeout(Duration::from_secs(5), image.set_source(&mut stream))
            .await
            .unwrap()
            .unwrap();

        load_end.await.unwrap();
        assert_eq!(DecodableImage::<&[u8]>::pixel_width(&image), 3);
        assert_eq!(DecodableImage::<&[u8]>::pixel_height(&image), 4);
    }

    #[tokio::test]
    async fn gives_up_on_an_endless_stream_without_a_header() {
        let image = HeaderImage::default();
        let mut stream = tokio::io::repeat(0);
        let load_end = events_for(&image, &stream).load_end();

        timeout(Duration::from_secs(30), image.set_source(&mut stream))
            .await
            .unwrap()
            .unwrap();

        let err = load_end.await.unwrap_err();
        assert!(err.to_string().contains(&MAX_HEADER_BYTES.to_string()));
    }
}
