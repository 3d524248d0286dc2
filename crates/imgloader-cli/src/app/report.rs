use imgloader::Error;
use serde::Serialize;
use std::io::{self, Write};

/// Outcome of one URI, printed as a single JSON line.
#[derive(Debug, Serialize)]
pub struct Report<'a, T> {
    pub uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl<'a, T> Report<'a, T> {
    pub fn new(uri: &'a str, outcome: Result<T, Error>) -> Self {
        match outcome {
            Ok(value) => Self {
                uri,
                ok: Some(value),
                error: None,
            },
            Err(error) => Self {
                uri,
                ok: None,
                error: Some(error),
            },
        }
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Writes one line per report and returns whether every one succeeded.
pub fn write_reports<W, T>(mut out: W, reports: &[Report<'_, T>]) -> io::Result<bool>
where
    W: Write,
    T: Serialize,
{
    for report in reports {
        serde_json::to_writer(&mut out, report)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(reports.iter().all(Report::is_ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgloader::{ErrorKind, ImageDimensions};

    fn render<T: Serialize>(reports: &[Report<'_, T>]) -> (String, bool) {
        let mut out = Vec::new();
        let all_ok = write_reports(&mut out, reports).unwrap();
        (String::from_utf8(out).unwrap(), all_ok)
    }

    #[test]
    fn prints_one_line_per_uri() {
        let reports = [
            Report::new("https://example.com/a.png", Ok(ImageDimensions::new(100, 50))),
            Report::new(
                "file:///missing.png",
                Err(Error::new(ErrorKind::SizeResolutionFailure, "not found")),
            ),
        ];

        let (out, all_ok) = render(&reports);
        assert!(!all_ok);
        assert_eq!(
            out,
            concat!(
                r#"{"uri":"https://example.com/a.png","ok":{"width":100,"height":50}}"#,
                "\n",
                r#"{"uri":"file:///missing.png","error":{"code":"E_GET_SIZE_FAILURE","message":"not found"}}"#,
                "\n",
            )
        );
    }

    #[test]
    fn all_ok_when_nothing_failed() {
        let reports = [Report::new("https://example.com/a.png", Ok(true))];
        let (out, all_ok) = render(&reports);
        assert!(all_ok);
        assert_eq!(out, "{\"uri\":\"https://example.com/a.png\",\"ok\":true}\n");
    }
}
