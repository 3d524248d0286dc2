use imgloader::{BoxError, StreamSource};
use std::{io, path::PathBuf};
use tokio::fs::File;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("unsupported URI scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("`{0}` does not name a local file")]
    NotAPath(String),
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opens local images: `file://` URLs and plain filesystem paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStreams;

impl FileStreams {
    /// Maps `uri` onto a filesystem path.
    ///
    /// Anything that does not parse as an absolute URL is taken as a path. A
    /// single-letter scheme is a Windows drive, not a scheme.
    pub fn resolve_path(uri: &str) -> Result<PathBuf, StreamError> {
        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|()| StreamError::NotAPath(uri.to_owned())),
            Ok(url) if url.scheme().len() > 1 => {
                Err(StreamError::UnsupportedScheme(url.scheme().to_owned()))
            }
            _ => Ok(PathBuf::from(uri)),
        }
    }
}

impl StreamSource for FileStreams {
    type Stream = File;

    async fn open_stream(&self, uri: &str) -> Result<File, BoxError> {
        let path = Self::resolve_path(uri)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(path = %path.display(), "opening local image");

        match File::open(&path).await {
            Ok(file) => Ok(file),
            Err(source) => Err(StreamError::Open { path, source }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn resolves_file_urls_and_plain_paths() {
        assert_eq!(
            FileStreams::resolve_path("file:///tmp/a.png").unwrap(),
            PathBuf::from("/tmp/a.png")
        );
        assert_eq!(
            FileStreams::resolve_path("images/a.png").unwrap(),
            PathBuf::from("images/a.png")
        );
        assert_eq!(
            FileStreams::resolve_path("/tmp/a b.png").unwrap(),
            PathBuf::from("/tmp/a b.png")
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            FileStreams::resolve_path("ms-appx:///Assets/a.png"),
            Err(StreamError::UnsupportedScheme(scheme)) if scheme == "ms-appx"
        ));
    }

    #[tokio::test]
    async fn opens_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();

        let uri = Url::from_file_path(&path).unwrap();
        let mut file = FileStreams.open_stream(uri.as_str()).await.unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"hello");
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");

        let err = FileStreams
            .open_stream(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn open_errors_display_the_path_then_the_cause() {
        let err = StreamError::Open {
            path: PathBuf::from("/srv/images/a.png"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.to_string(), "/srv/images/a.png: no such file");
    }
}
