/// file: src/extract.rs
/// description: Maps one `videoRenderer` record into a normalized VideoResult.
/// Record extraction. Every read goes through the optional accessors below,
/// so a missing or oddly shaped sub-tree only blanks the field it feeds.
use crate::models::VideoResult;
use crate::normalize::{Count, Locale, clean_text};
use serde_json::{Map, Value};

pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

// ---------------------------------------------------------------------------
// Safe accessors
// ---------------------------------------------------------------------------

fn at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(v, |cur, key| cur.get(*key))
}

fn field<'a>(record: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    at(record.get(*first)?, rest)
}

/// `record[key].simpleText` when it is a string.
fn simple_text<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    field(record, &[key, "simpleText"])?.as_str()
}

/// `record[key].runs` when it is a list.
fn runs<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a [Value]> {
    field(record, &[key, "runs"])?.as_array().map(Vec::as_slice)
}

fn run_text(run: &Value) -> &str {
    run.get("text").and_then(Value::as_str).unwrap_or("")
}

fn join_runs(runs: &[Value]) -> String {
    runs.iter().map(run_text).collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Record → result
// ---------------------------------------------------------------------------

/// Returns `None` for records without a non-empty string `videoId` or with a
/// title that cleans to nothing.
pub fn parse_video_renderer(record: &Map<String, Value>, locale: &Locale) -> Option<VideoResult> {
    let id = record
        .get("videoId")?
        .as_str()
        .filter(|id| !id.is_empty())?;

    let title_runs = runs(record, "title").map(join_runs).unwrap_or_default();
    let title = clean_text(Some(title_runs.as_str()));
    if title.is_empty() {
        return None;
    }

    let duration = simple_text(record, "lengthText").or_else(|| overlay_duration(record));

    let published_at = simple_text(record, "publishedTimeText")
        .unwrap_or(locale.recent_label)
        .to_string();

    let channel = runs(record, "ownerText")
        .or_else(|| runs(record, "longBylineText"))
        .and_then(|r| r.first())
        .map(run_text);

    let views = simple_text(record, "viewCountText")
        .or_else(|| simple_text(record, "shortViewCountText"))
        .map(Count::Text);

    Some(VideoResult {
        id: id.to_string(),
        url: watch_url(id),
        title,
        description: description(record),
        duration: locale.format_runtime(duration),
        views: locale.format_count(views),
        published_at,
        channel_title: clean_text(channel),
        thumbnail: best_thumbnail(record).unwrap_or_else(|| fallback_thumbnail(id)),
    })
}

pub fn watch_url(id: &str) -> String {
    format!("{WATCH_URL_BASE}{}", urlencoding::encode(id))
}

pub fn fallback_thumbnail(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", urlencoding::encode(id))
}

/// First time-status badge among the thumbnail overlays.
fn overlay_duration(record: &Map<String, Value>) -> Option<&str> {
    record
        .get("thumbnailOverlays")?
        .as_array()?
        .iter()
        .find_map(|overlay| {
            at(
                overlay,
                &["thumbnailOverlayTimeStatusRenderer", "text", "simpleText"],
            )?
            .as_str()
        })
}

/// Thumbnails are listed smallest first; the last one wins.
fn best_thumbnail(record: &Map<String, Value>) -> Option<String> {
    let url = field(record, &["thumbnail", "thumbnails"])?
        .as_array()?
        .last()?
        .get("url")?
        .as_str()?;

    if url.is_empty() {
        None
    } else if url.starts_with("//") {
        Some(format!("https:{url}"))
    } else {
        Some(url.to_string())
    }
}

fn description(record: &Map<String, Value>) -> String {
    let detailed = record
        .get("detailedMetadataSnippets")
        .and_then(Value::as_array)
        .and_then(|snippets| snippets.first());

    let text = match detailed {
        Some(snippet) => at(snippet, &["snippetText", "runs"])
            .and_then(Value::as_array)
            .map(|r| join_runs(r.as_slice())),
        None => runs(record, "descriptionSnippet").map(join_runs),
    };

    clean_text(text.as_deref())
}
