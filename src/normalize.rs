/// file: src/normalize.rs
/// description: Pure text transforms for titles, runtimes and view counts.
/// Text normalization: turns locale-formatted strings from the search page
/// into stable display values.
///
/// Locale-specific words (magnitude suffixes, the "live" and "recent" labels)
/// live in a [`Locale`] table. Only [`PT_BR`] ships; the parsing algorithm
/// never looks at language-specific strings directly.
use regex::Regex;
use std::sync::LazyLock;

/// Shown whenever a runtime or count cannot be derived.
pub const PLACEHOLDER: &str = "—";

// ---------------------------------------------------------------------------
// Locale table
// ---------------------------------------------------------------------------

/// Multiplier applied when any of `needles` occurs in a lower-cased count.
#[derive(Debug)]
pub struct Magnitude {
    pub needles: &'static [&'static str],
    pub factor: f64,
}

#[derive(Debug)]
pub struct Locale {
    /// Replaces runtimes of live streams.
    pub live_label: &'static str,
    /// Used when a record carries no publish time.
    pub recent_label: &'static str,
    /// Checked in order; first match wins.
    pub magnitudes: &'static [Magnitude],
    /// Display suffixes for 10^3, 10^6, 10^9.
    pub units: &'static [&'static str],
    pub thousands_separator: char,
}

pub static PT_BR: Locale = Locale {
    live_label: "Ao vivo agora",
    recent_label: "· recente",
    magnitudes: &[
        Magnitude {
            needles: &["bilhão", " bi"],
            factor: 1e9,
        },
        Magnitude {
            needles: &["milhão", " mi"],
            factor: 1e6,
        },
        Magnitude {
            needles: &["mil", "k"],
            factor: 1e3,
        },
    ],
    units: &["mil", "mi", "bi"],
    thousands_separator: '.',
};

/// Raw view count as found in the payload: already numeric, or display text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Count<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> From<&'a str> for Count<'a> {
    fn from(s: &'a str) -> Self {
        Count::Text(s)
    }
}

impl From<f64> for Count<'_> {
    fn from(n: f64) -> Self {
        Count::Number(n)
    }
}

impl From<i64> for Count<'_> {
    fn from(n: i64) -> Self {
        Count::Number(n as f64)
    }
}

static UNICODE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})|\\u([0-9a-fA-F]{4})")
        .expect("static regex")
});

static ENTITIES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("&amp;", "&"),
        ("&quot;", "\""),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&apos;", "'"),
    ]
    .into_iter()
    .map(|(entity, ch)| {
        (
            Regex::new(&format!("(?i){}", regex::escape(entity))).expect("static regex"),
            ch,
        )
    })
    .collect()
});

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\p{L}\p{N}\s\-_.,!?'":;%&()/]"#).expect("static regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

static COUNT_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9,.]+").expect("static regex"));

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Decodes literal `\uXXXX` sequences and a few HTML entities, drops symbols
/// outside the display allow-list and collapses whitespace.
pub fn clean_text(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let decoded = UNICODE_ESCAPE.replace_all(raw, |caps: &regex::Captures<'_>| {
        let unit = |i: usize| {
            caps.get(i)
                .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok())
        };
        let code = match (unit(1), unit(2), unit(3)) {
            (Some(hi), Some(lo), _) => Some(0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00)),
            (_, _, single) => single,
        };
        // Lone surrogates have no char; they would be stripped below anyway.
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // Decoding can uncover an entity (`&amp;amp;`) and stripping can splice
    // one together (`&am#p;`), so repeat until nothing changes. Every pass
    // that changes the text shortens it.
    let mut text = decoded.into_owned();
    loop {
        let next = decode_and_strip(&text);
        if next == text {
            break;
        }
        text = next;
    }

    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_and_strip(text: &str) -> String {
    let mut out = text.to_string();
    for (entity, replacement) in ENTITIES.iter() {
        out = entity.replace_all(&out, *replacement).into_owned();
    }
    DISALLOWED.replace_all(&out, "").into_owned()
}

// ---------------------------------------------------------------------------
// Runtimes and counts
// ---------------------------------------------------------------------------

impl Locale {
    /// Table for a language tag such as `pt-BR`, matched on the primary
    /// subtag. `None` when no table covers the language.
    pub fn for_tag(tag: &str) -> Option<&'static Locale> {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "pt" => Some(&PT_BR),
            _ => None,
        }
    }

    /// `"1:5"` becomes `"1:05"`. Anything with a non-numeric segment is
    /// returned trimmed but otherwise untouched.
    pub fn format_runtime(&self, raw: Option<&str>) -> String {
        let trimmed = match raw.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return PLACEHOLDER.to_string(),
        };

        if trimmed.to_lowercase().contains("live") {
            return self.live_label.to_string();
        }

        let segments: Option<Vec<u64>> = trimmed
            .split(':')
            .map(|part| part.trim().parse::<u64>().ok())
            .collect();
        let Some(segments) = segments else {
            return trimmed.to_string();
        };

        segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                if i == 0 {
                    seg.to_string()
                } else {
                    format!("{seg:02}")
                }
            })
            .collect::<Vec<_>>()
            .join(":")
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    /// Reads a count such as `"1,2 mi visualizações"`. `.` is a grouping
    /// separator and `,` the decimal point.
    pub fn parse_view_count(&self, raw: Option<Count<'_>>) -> Option<f64> {
        let text = match raw? {
            Count::Number(n) => return Some(n),
            Count::Text(t) => t,
        };

        let normalized = WHITESPACE.replace_all(text, " ").to_lowercase();
        let run = COUNT_DIGITS.find(&normalized)?.as_str();

        let value = run
            .replace('.', "")
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .or_else(|| {
                run.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse::<f64>()
                    .ok()
            })?;

        let factor = self
            .magnitudes
            .iter()
            .find(|m| m.needles.iter().any(|n| normalized.contains(n)))
            .map_or(1.0, |m| m.factor);

        Some((value * factor).round())
    }

    /// Compact display form: `950`, `12 mil`, `1.2 mi`.
    pub fn format_count(&self, raw: Option<Count<'_>>) -> String {
        let value = match self.parse_view_count(raw) {
            Some(v) if v.is_finite() && v != 0.0 => v,
            _ => return PLACEHOLDER.to_string(),
        };

        if value < 1000.0 {
            return self.group_thousands(value);
        }

        let index = ((value.log10() / 3.0).floor() as usize).clamp(1, self.units.len());
        let scaled = value / 1000f64.powi(index as i32);
        let decimals: usize = if scaled < 10.0 { 1 } else { 0 };
        // Ties go up (`10.5` -> `11`); `{:.N}` alone would round them to even.
        let step = 10f64.powi(decimals as i32);
        let rounded = (scaled * step).round() / step;
        format!("{rounded:.decimals$} {}", self.units[index - 1])
    }

    fn group_thousands(&self, value: f64) -> String {
        if value.fract() != 0.0 {
            return value.to_string();
        }
        let digits = (value.abs() as u64).to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(self.thousands_separator);
            }
            out.push(ch);
        }
        if value < 0.0 {
            out.insert(0, '-');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_pads_all_but_first_segment() {
        assert_eq!(PT_BR.format_runtime(Some("1:5")), "1:05");
        assert_eq!(PT_BR.format_runtime(Some("65:30")), "65:30");
        assert_eq!(PT_BR.format_runtime(Some("1:2:3")), "1:02:03");
        assert_eq!(PT_BR.format_runtime(Some(" 10:07 ")), "10:07");
    }

    #[test]
    fn runtime_markers_and_fallbacks() {
        assert_eq!(PT_BR.format_runtime(Some("LIVE")), "Ao vivo agora");
        assert_eq!(PT_BR.format_runtime(Some("Live now")), "Ao vivo agora");
        assert_eq!(PT_BR.format_runtime(None), PLACEHOLDER);
        assert_eq!(PT_BR.format_runtime(Some("   ")), PLACEHOLDER);
        assert_eq!(PT_BR.format_runtime(Some("abc")), "abc");
        assert_eq!(PT_BR.format_runtime(Some("1:xx")), "1:xx");
    }

    #[test]
    fn view_count_parsing() {
        assert_eq!(PT_BR.parse_view_count(Some("1,2 mi".into())), Some(1_200_000.0));
        assert_eq!(PT_BR.parse_view_count(Some("950".into())), Some(950.0));
        assert_eq!(PT_BR.parse_view_count(None), None);
        assert_eq!(PT_BR.parse_view_count(Some("no digits here".into())), None);
        assert_eq!(
            PT_BR.parse_view_count(Some("1.234.567 visualizações".into())),
            Some(1_234_567.0)
        );
        assert_eq!(PT_BR.parse_view_count(Some("3,4k".into())), Some(3_400.0));
        assert_eq!(PT_BR.parse_view_count(Some("2 bilhões".into())), Some(2e9));
        assert_eq!(PT_BR.parse_view_count(Some("12K views".into())), Some(12_000.0));
    }

    #[test]
    fn view_count_numbers_pass_through() {
        assert_eq!(PT_BR.parse_view_count(Some(42.5f64.into())), Some(42.5));
        assert_eq!(PT_BR.parse_view_count(Some(7i64.into())), Some(7.0));
    }

    #[test]
    fn view_count_falls_back_to_digits() {
        // "1,2,3" reads as "1.2.3" which is not a number.
        assert_eq!(PT_BR.parse_view_count(Some("1,2,3".into())), Some(123.0));
        assert_eq!(PT_BR.parse_view_count(Some(",".into())), None);
    }

    #[test]
    fn count_formatting() {
        assert_eq!(PT_BR.format_count(Some(950i64.into())), "950");
        assert_eq!(PT_BR.format_count(Some(1_200_000i64.into())), "1.2 mi");
        assert_eq!(PT_BR.format_count(Some(12_000i64.into())), "12 mil");
        assert_eq!(PT_BR.format_count(Some(3_400_000_000i64.into())), "3.4 bi");
        assert_eq!(PT_BR.format_count(Some("1,2 mi visualizações".into())), "1.2 mi");
        assert_eq!(PT_BR.format_count(Some(2_500_000_000_000i64.into())), "2500 bi");
    }

    #[test]
    fn count_ties_round_up() {
        assert_eq!(PT_BR.format_count(Some(10_500i64.into())), "11 mil");
        assert_eq!(PT_BR.format_count(Some(12_500i64.into())), "13 mil");
        assert_eq!(PT_BR.format_count(Some(1_250_000i64.into())), "1.3 mi");
        assert_eq!(PT_BR.format_count(Some("10.500 visualizações".into())), "11 mil");
        assert_eq!(PT_BR.format_count(Some(1_240_000i64.into())), "1.2 mi");
    }

    #[test]
    fn locale_lookup_by_tag() {
        assert!(std::ptr::eq(Locale::for_tag("pt-BR").unwrap(), &PT_BR));
        assert!(Locale::for_tag("pt").is_some());
        assert!(Locale::for_tag("PT_br").is_some());
        assert!(Locale::for_tag("en-US").is_none());
        assert!(Locale::for_tag("").is_none());
    }

    #[test]
    fn count_placeholder() {
        assert_eq!(PT_BR.format_count(None), PLACEHOLDER);
        assert_eq!(PT_BR.format_count(Some("sem visualizações".into())), PLACEHOLDER);
        assert_eq!(PT_BR.format_count(Some(0i64.into())), PLACEHOLDER);
        assert_eq!(PT_BR.format_count(Some(f64::INFINITY.into())), PLACEHOLDER);
    }

    #[test]
    fn clean_text_decodes_and_strips() {
        assert_eq!(clean_text(Some(r"&amp;ol\u00e1")), "&olá");
        assert_eq!(clean_text(Some("Tom &QUOT;Jerry&quot;")), "Tom \"Jerry\"");
        assert_eq!(clean_text(Some("a <b> c")), "a b c");
        assert_eq!(clean_text(Some("Rust 🦀 | async\n\n  await")), "Rust async await");
        assert_eq!(clean_text(Some(r"smile \ud83d\ude00!")), "smile !");
        assert_eq!(clean_text(Some(r"caf\u00E9 \u0026amp; p\u00e3o")), "café & pão");
        assert_eq!(clean_text(None), "");
    }

    #[test]
    fn clean_text_decodes_nested_entities() {
        assert_eq!(clean_text(Some("&amp;amp;")), "&");
        assert_eq!(clean_text(Some("&am#p;")), "&");
        assert_eq!(clean_text(Some("Tom &amp;quot;Jerry&amp;quot;")), "Tom \"Jerry\"");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let inputs = [
            r"&amp;ol\u00e1 mundo",
            "  Música   ao vivo (2024) — parte 1/2 ",
            "100% \"real\": tudo; certo?",
            "it&apos;s #1 @home",
            "&amp;amp;",
            "&am#p;",
            "&a&lt;mp;lt;",
            "",
        ];
        for input in inputs {
            let once = clean_text(Some(input));
            assert_eq!(clean_text(Some(&once)), once, "input: {input:?}");
        }
    }
}
