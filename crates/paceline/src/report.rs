use std::collections::BTreeMap;

use console::style;
use paceline_fetch::Fetched;
use paceline_format::pretty_speed;
use serde::Serialize;

/// Machine-readable outcome of a finished transfer.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub url: String,
    pub status: u16,
    pub phase: &'static str,
    pub bytes: u64,
    pub content_length: Option<u64>,
    pub elapsed_secs: f64,
    pub average_speed: u64,
    pub headers: BTreeMap<String, String>,
}

impl<T> From<&Fetched<T>> for Summary {
    fn from(fetched: &Fetched<T>) -> Self {
        let progress = &fetched.progress;
        let headers = fetched
            .headers
            .iter()
            .map(|(name, value)| {
                (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        Self {
            url: fetched.url.to_string(),
            status: fetched.status.as_u16(),
            phase: progress.phase.as_str(),
            bytes: progress.bytes_transferred,
            content_length: progress.content_length,
            elapsed_secs: progress.elapsed.as_secs_f64(),
            average_speed: progress.instant_rate,
            headers,
        }
    }
}

impl Summary {
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }

    /// One-line human summary.
    pub fn line(&self) -> String {
        format!(
            "{} {} {} in {:.1}s ({})",
            style(self.status).bold().green(),
            style(&self.url).cyan(),
            paceline_format::pretty_size(self.bytes),
            self.elapsed_secs,
            pretty_speed(self.average_speed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paceline_fetch::Progress;
    use paceline_fetch::http::{HeaderMap, StatusCode};
    use std::time::Duration;

    #[test]
    fn test_summary_json() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        let fetched = Fetched {
            status: StatusCode::OK,
            url: "http://example.com/a".parse().unwrap(),
            headers,
            progress: Progress {
                bytes_transferred: 2048,
                content_length: Some(2048),
                elapsed: Duration::from_secs(2),
                instant_rate: 1024,
                ..Progress::default()
            },
            body: (),
        };

        let summary = Summary::from(&fetched);
        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["bytes"], 2048);
        assert_eq!(json["average_speed"], 1024);
        assert_eq!(json["headers"]["content-type"], "text/plain");
        assert_eq!(json["elapsed_secs"], 2.0);
    }
}
