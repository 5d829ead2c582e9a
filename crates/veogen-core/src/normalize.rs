//! Video URL extraction from provider responses.
//!
//! The provider has shipped several response layouts. Each known layout is a
//! [`Probe`]; probes are tried in order and the first non-empty string wins.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::CompletionRecord;
use crate::task::TaskId;

/// A path of object keys leading to a candidate URL.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub name: &'static str,
    path: &'static [&'static str],
}

impl Probe {
    const fn new(name: &'static str, path: &'static [&'static str]) -> Self {
        Self { name, path }
    }

    /// Follow the path; `None` on any missing segment, non-string leaf, or
    /// empty string.
    pub fn find<'a>(&self, raw: &'a Value) -> Option<&'a str> {
        self.path
            .iter()
            .try_fold(raw, |node, key| node.get(key))
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
    }
}

/// Known layouts, most common first.
pub const VIDEO_URL_PROBES: &[Probe] = &[
    Probe::new("video.url", &["video", "url"]),
    Probe::new("url", &["url"]),
    Probe::new("data.video.url", &["data", "video", "url"]),
    Probe::new("data.url", &["data", "url"]),
    Probe::new("output.url", &["output", "url"]),
    Probe::new("output.video.url", &["output", "video", "url"]),
];

/// Find the video URL in a raw response.
pub fn extract_video_url(raw: &Value) -> Result<&str> {
    let Some((probe, url)) = VIDEO_URL_PROBES
        .iter()
        .find_map(|probe| probe.find(raw).map(|url| (probe, url)))
    else {
        return Err(Error::ResponseShape {
            keys: top_level_keys(raw),
        });
    };
    debug!(probe = probe.name, "Video URL located");
    Ok(url)
}

/// Normalize a raw response into the canonical completion record.
pub fn normalize_response(task_id: &TaskId, raw: &Value) -> Result<CompletionRecord> {
    let video_url = extract_video_url(raw)?;
    Ok(CompletionRecord {
        task_id: task_id.clone(),
        video_url: video_url.to_string(),
    })
}

fn top_level_keys(raw: &Value) -> Vec<String> {
    raw.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn probe_names_match_their_paths() {
        for probe in VIDEO_URL_PROBES {
            assert_eq!(probe.name, probe.path.join("."));
        }
    }

    #[test]
    fn flat_video_url() {
        let raw = json!({"video": {"url": "https://x/y.mp4"}});
        assert_eq!(extract_video_url(&raw).unwrap(), "https://x/y.mp4");
    }

    #[test]
    fn bare_url_field() {
        let raw = json!({"url": "https://x/bare.mp4", "seed": 4});
        assert_eq!(extract_video_url(&raw).unwrap(), "https://x/bare.mp4");
    }

    #[test]
    fn data_wrapped_shapes() {
        let nested = json!({"data": {"video": {"url": "https://x/dv.mp4"}}});
        assert_eq!(extract_video_url(&nested).unwrap(), "https://x/dv.mp4");

        let flat = json!({"data": {"url": "https://x/d.mp4"}});
        assert_eq!(extract_video_url(&flat).unwrap(), "https://x/d.mp4");
    }

    #[test]
    fn output_wrapped_shapes() {
        let flat = json!({"output": {"url": "https://x/o.mp4"}});
        assert_eq!(extract_video_url(&flat).unwrap(), "https://x/o.mp4");

        let nested = json!({"output": {"video": {"url": "https://x/ov.mp4"}}});
        assert_eq!(extract_video_url(&nested).unwrap(), "https://x/ov.mp4");
    }

    #[test]
    fn earlier_probe_wins() {
        let raw = json!({
            "output": {"url": "https://x/late.mp4"},
            "video": {"url": "https://x/early.mp4"}
        });
        assert_eq!(extract_video_url(&raw).unwrap(), "https://x/early.mp4");
    }

    #[test]
    fn empty_and_non_string_candidates_are_skipped() {
        let raw = json!({
            "video": {"url": ""},
            "url": 42,
            "data": {"url": "https://x/fallback.mp4"}
        });
        assert_eq!(extract_video_url(&raw).unwrap(), "https://x/fallback.mp4");
    }

    #[test]
    fn unknown_shape_lists_top_level_keys() {
        let raw = json!({"request_id": "abc", "result": {"file": "nope"}});
        match extract_video_url(&raw).unwrap_err() {
            Error::ResponseShape { keys } => assert_eq!(keys, vec!["request_id", "result"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_object_input_is_a_shape_error_with_no_keys() {
        for raw in [json!(null), json!("https://x"), json!([1, 2]), json!(3.5)] {
            match extract_video_url(&raw).unwrap_err() {
                Error::ResponseShape { keys } => assert!(keys.is_empty()),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn normalize_builds_completion_record() {
        let raw = json!({"video": {"url": "https://x/y.mp4"}});
        let record = normalize_response(&TaskId::from("task-9"), &raw).unwrap();
        assert_eq!(record.task_id.as_str(), "task-9");
        assert_eq!(record.video_url, "https://x/y.mp4");
    }
}
