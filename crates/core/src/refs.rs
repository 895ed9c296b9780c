use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

const MIN_ID_LEN: usize = 6;
const MAX_RAW_ID_LEN: usize = 20;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Leading run of id characters, if it is long enough to be an id.
fn id_prefix(s: &str) -> Option<String> {
    let end = s.find(|c: char| !is_id_char(c)).unwrap_or(s.len());
    let id = &s[..end];
    (id.len() >= MIN_ID_LEN).then(|| id.to_string())
}

/// Pulls a video id out of a watch URL, share link, embed URL or raw id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parsed = Url::parse(input)
        .ok()
        .or_else(|| Url::parse(&format!("https://{input}")).ok().filter(|_| input.contains('/')));

    if let Some(url) = parsed {
        if let Some(id) = id_from_url(&url) {
            return Some(id);
        }
    }

    let raw_ok = (MIN_ID_LEN..=MAX_RAW_ID_LEN).contains(&input.len()) && input.chars().all(is_id_char);
    raw_ok.then(|| input.to_string())
}

fn id_from_url(url: &Url) -> Option<String> {
    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        if let Some(id) = id_prefix(&v) {
            return Some(id);
        }
    }

    let host = url.host_str().unwrap_or_default();
    let mut segments = url.path_segments()?;
    if host.ends_with("youtu.be") {
        return segments.next().and_then(id_prefix);
    }

    while let Some(seg) = segments.next() {
        if seg == "v" || seg == "embed" {
            return segments.next().and_then(id_prefix);
        }
    }
    None
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

pub fn oembed_url(id: &str) -> String {
    let target = utf8_percent_encode(&watch_url(id), NON_ALPHANUMERIC).to_string();
    format!("https://www.youtube.com/oembed?url={target}&format=json")
}

pub fn noembed_url(id: &str) -> String {
    let target = utf8_percent_encode(&watch_url(id), NON_ALPHANUMERIC).to_string();
    format!("https://noembed.com/embed?url={target}")
}

/// `m:ss` rendering for progress displays.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::{extract_video_id, format_time, noembed_url, oembed_url};

    #[test]
    fn extracts_ids_from_common_url_shapes() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ&t=42", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ?si=abc", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/v/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("  dQw4w9WgXcQ  ", "dQw4w9WgXcQ"),
        ];
        for (input, want) in cases {
            assert_eq!(extract_video_id(input).as_deref(), Some(want), "{input}");
        }
    }

    #[test]
    fn rejects_unparseable_references() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("abc"), None);
        assert_eq!(extract_video_id("not a video id"), None);
        assert_eq!(extract_video_id("https://example.com/about"), None);
        assert_eq!(extract_video_id("abcdefghijklmnopqrstuvwxyz"), None);
    }

    #[test]
    fn oembed_urls_encode_the_watch_url() {
        assert_eq!(
            oembed_url("abc123"),
            "https://www.youtube.com/oembed?url=https%3A%2F%2Fwww%2Eyoutube%2Ecom%2Fwatch%3Fv%3Dabc123&format=json"
        );
        assert!(noembed_url("abc123").starts_with("https://noembed.com/embed?url=https%3A"));
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
