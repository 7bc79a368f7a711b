//! Scene-style release name parser.
//!
//! Names are split on `.`, space and `_`. Everything before the first
//! strong attribute (year, episode marker, resolution, source, codec, ...)
//! is the title; weak tags (language, edition, repack markers) trailing the
//! title are peeled back off it. Tokens after the title that match nothing
//! are ignored.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{normalize, Release};

/// Turns a free-text release name into a [`Release`].
pub trait ReleaseParser: Send + Sync {
    fn parse(&self, name: &str) -> Release;

    /// Normalization used for grouping keys and group comparison.
    fn normalize(&self, value: &str) -> String {
        normalize(value)
    }
}

/// Built-in parser for dot-separated scene names.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneParser;

impl SceneParser {
    pub fn new() -> Self {
        Self
    }
}

/// Extensions are matched case-sensitively so that the `TS` source tag is
/// never mistaken for a `.ts` container.
const EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "avi", "ts", "wmv", "webp", "xvid", "divx", "mov",
];

const SOURCES: &[(&str, &str)] = &[
    ("web-dl", "WEB-DL"),
    ("webdl", "WEB-DL"),
    ("web.dl", "WEB-DL"),
    ("uhd.bluray", "UHD.BluRay"),
    ("uhd.blu-ray", "UHD.BluRay"),
    ("bluray", "BluRay"),
    ("blu-ray", "BluRay"),
    ("web", "WEB"),
    ("webrip", "WEBRiP"),
    ("web-rip", "WEBRiP"),
    ("bdrip", "BDRiP"),
    ("brrip", "BDRiP"),
    ("hdrip", "HDRiP"),
    ("hdtv", "HDTV"),
    ("dvdrip", "DVDRiP"),
    ("hdtc", "HDTC"),
    ("hdts", "HDTS"),
    ("tc", "TC"),
    ("telecine", "TC"),
    ("vhsrip", "VHSRiP"),
    ("workprint", "WORKPRiNT"),
    ("ts", "TS"),
    ("telesync", "TS"),
    ("hdcam", "HDCAM"),
    ("cam", "CAM"),
    ("camrip", "CAM"),
    ("dvd", "DVD"),
    ("dvdr", "DVDR"),
    ("pdtv", "PDTV"),
    ("sdtv", "SDTV"),
];

const HDR: &[(&str, &str)] = &[
    ("dv", "DV"),
    ("dovi", "DoVi"),
    ("hdr10+", "HDR10+"),
    ("hdr10plus", "HDR10+"),
    ("hdr10", "HDR10"),
    ("hdr+", "HDR+"),
    ("hdr", "HDR"),
    ("hlg", "HLG"),
    ("sdr", "SDR"),
];

const AUDIO: &[(&str, &str)] = &[
    ("flac", "FLAC"),
    ("lpcm", "LPCM"),
    ("pcm", "LPCM"),
    ("dts-x", "DTS-X"),
    ("dtsx", "DTS-X"),
    ("dts-hd.hra", "DTS-HD.HRA"),
    ("ddpa", "DDPA"),
    ("truehd", "TrueHD"),
    ("dts-hd.ma", "DTS-HD.MA"),
    ("dts-ma", "DTS-MA"),
    ("dts-hd.hr", "DTS-HD.HR"),
    ("atmos", "Atmos"),
    ("dts-hd", "DTS-HD"),
    ("ddp", "DDP"),
    ("dd+", "DDP"),
    ("eac3", "DDP"),
    ("e-ac-3", "DDP"),
    ("dts", "DTS"),
    ("dd", "DD"),
    ("ac3", "DD"),
    ("opus", "OPUS"),
    ("aac", "AAC"),
    ("dual.audio", "DUAL.AUDIO"),
    ("dual-audio", "DUAL.AUDIO"),
    ("mp3", "MP3"),
];

const LANGUAGES: &[(&str, &str)] = &[
    ("english", "ENGLiSH"),
    ("multi", "MULTi"),
    ("french", "FRENCH"),
    ("swedish", "SWEDiSH"),
    ("swesub", "SWESUB"),
    ("norwegian", "NORWEGiAN"),
    ("nordicsubs", "NORDiCSUBS"),
    ("dubbed", "DUBBED"),
    ("danish", "DANiSH"),
    ("hindi", "HiNDI"),
    ("nordic", "NORDiC"),
    ("german", "GERMAN"),
    ("subbed", "SUBBED"),
    ("czech", "CZECH"),
    ("russian", "RUSSiAN"),
    ("italian", "iTALiAN"),
    ("spanish", "SPANiSH"),
    ("japanese", "JAPANESE"),
];

// EXTENDED and REMASTERED live here rather than under editions so that
// they stay in the same grouping bucket as the plain release.
const OTHER: &[(&str, &str)] = &[
    ("complete", "COMPLETE"),
    ("remux", "REMUX"),
    ("fs", "FS"),
    ("extended", "EXTENDED"),
    ("remastered", "REMASTERED"),
    ("proper", "PROPER"),
    ("repack", "REPACK"),
    ("internal", "INTERNAL"),
    ("rerip", "RERiP"),
    ("readnfo", "READNFO"),
    ("hybrid", "HYBRiD"),
];

const EDITIONS: &[(&str, &str)] = &[
    ("unrated", "UNRATED"),
    ("uncut", "UNCUT"),
    ("imax", "IMAX"),
    ("criterion", "CRiTERiON"),
];

const CUTS: &[(&str, &str)] = &[
    ("directors.cut", "Directors.Cut"),
    ("theatrical.cut", "Theatrical.Cut"),
    ("final.cut", "Final.Cut"),
];

const CODECS: &[(&str, &str)] = &[
    ("x264", "x264"),
    ("x265", "x265"),
    ("h264", "H.264"),
    ("h.264", "H.264"),
    ("h265", "H.265"),
    ("h.265", "H.265"),
    ("hevc", "HEVC"),
    ("avc", "AVC"),
    ("xvid", "XviD"),
    ("divx", "DivX"),
    ("av1", "AV1"),
    ("vc-1", "VC-1"),
    ("10bit", "10bit"),
];

static EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^S(\d{1,3})(?:E(\d{1,4}))?(?:-?E\d{1,4})*$").expect("valid episode regex")
});
static CROSS_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})x(\d{2,3})$").expect("valid cross episode regex"));
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}$").expect("valid year regex"));
static TWO_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}$").expect("valid regex"));
static RESOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{3,4})([pi])$").expect("valid resolution regex"));
static AUDIO_CHANNELS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(ddp|dd\+|dd|eac3|ac3|aac|dts|truehd|opus|flac|lpcm)(\d\.\d)$")
        .expect("valid audio channel regex")
});
static CHANNELS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d\.\d$").expect("valid regex"));
static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^v(\d{1,2})$").expect("valid version regex"));

/// A recognised attribute occupying one or more tokens.
#[derive(Debug, Clone, PartialEq)]
enum Attr {
    Year(u16),
    Date(u16, u8, u8),
    Episode(u32, u32),
    Resolution(String),
    Source(String),
    Audio(String),
    AudioChannels(String, String),
    Channels(String),
    Hdr(String),
    Language(String),
    Other(String),
    Edition(String),
    Cut(String),
    Codec(String),
    Version(String),
}

impl Attr {
    /// Weak attributes double as ordinary title words.
    fn is_weak(&self) -> bool {
        matches!(
            self,
            Attr::Language(_) | Attr::Other(_) | Attr::Edition(_) | Attr::Cut(_) | Attr::Version(_)
        )
    }

    fn apply(self, release: &mut Release) {
        match self {
            Attr::Year(year) => {
                if release.year == 0 {
                    release.year = year;
                }
            }
            Attr::Date(year, month, day) => {
                if release.year == 0 {
                    release.year = year;
                    release.month = month;
                    release.day = day;
                }
            }
            Attr::Episode(series, episode) => {
                if release.series == 0 && release.episode == 0 {
                    release.series = series;
                    release.episode = episode;
                }
            }
            Attr::Resolution(value) => set_once(&mut release.resolution, value),
            Attr::Source(value) => set_once(&mut release.source, value),
            Attr::Audio(value) => {
                release.audio.insert(value);
            }
            Attr::AudioChannels(audio, channels) => {
                release.audio.insert(audio);
                set_once(&mut release.channels, channels);
            }
            Attr::Channels(value) => set_once(&mut release.channels, value),
            Attr::Hdr(value) => {
                release.hdr.insert(value);
            }
            Attr::Language(value) => {
                release.language.insert(value);
            }
            Attr::Other(value) => {
                release.other.insert(value);
            }
            Attr::Edition(value) => {
                release.edition.insert(value);
            }
            Attr::Cut(value) => {
                release.cut.insert(value);
            }
            Attr::Codec(value) => {
                release.codec.insert(value);
            }
            Attr::Version(value) => set_once(&mut release.version, value),
        }
    }
}

fn set_once(slot: &mut String, value: String) {
    if slot.is_empty() {
        *slot = value;
    }
}

fn lookup(table: &[(&str, &'static str)], token: &str) -> Option<&'static str> {
    let lower = token.to_lowercase();
    table
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, canonical)| *canonical)
}

/// Classify a single (possibly dot-joined) token.
fn classify(token: &str) -> Option<Attr> {
    if let Some(caps) = RESOLUTION.captures(token) {
        return Some(Attr::Resolution(format!(
            "{}{}",
            &caps[1],
            caps[2].to_lowercase()
        )));
    }
    if token.eq_ignore_ascii_case("4k") {
        return Some(Attr::Resolution("2160p".to_string()));
    }
    if let Some(caps) = AUDIO_CHANNELS.captures(token) {
        let audio = lookup(AUDIO, &caps[1])?;
        return Some(Attr::AudioChannels(audio.to_string(), caps[2].to_string()));
    }
    if CHANNELS.is_match(token) {
        return Some(Attr::Channels(token.to_string()));
    }
    if let Some(caps) = EPISODE.captures(token) {
        let series = caps[1].parse().unwrap_or(0);
        let episode = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return Some(Attr::Episode(series, episode));
    }
    if let Some(caps) = CROSS_EPISODE.captures(token) {
        return Some(Attr::Episode(
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
        ));
    }

    let tables: [(&[(&str, &str)], fn(String) -> Attr); 8] = [
        (SOURCES, Attr::Source),
        (HDR, Attr::Hdr),
        (AUDIO, Attr::Audio),
        (CODECS, Attr::Codec),
        (LANGUAGES, Attr::Language),
        (OTHER, Attr::Other),
        (EDITIONS, Attr::Edition),
        (CUTS, Attr::Cut),
    ];
    for (table, build) in tables {
        if let Some(canonical) = lookup(table, token) {
            return Some(build(canonical.to_string()));
        }
    }

    if VERSION.is_match(token) {
        return Some(Attr::Version(token.to_lowercase()));
    }

    None
}

fn parse_year(token: &str) -> Option<u16> {
    YEAR.is_match(token).then(|| token.parse().ok()).flatten()
}

/// Match the longest attribute starting at `tokens[i]`.
///
/// Returns the attribute and the number of tokens it spans.
fn match_at(tokens: &[&str], i: usize) -> Option<(Attr, usize)> {
    if i + 2 < tokens.len() {
        if let Some(year) = parse_year(tokens[i]) {
            if TWO_DIGITS.is_match(tokens[i + 1]) && TWO_DIGITS.is_match(tokens[i + 2]) {
                let month: u8 = tokens[i + 1].parse().unwrap_or(0);
                let day: u8 = tokens[i + 2].parse().unwrap_or(0);
                if (1..=12).contains(&month) && (1..=31).contains(&day) {
                    return Some((Attr::Date(year, month, day), 3));
                }
            }
        }
    }

    for width in [3, 2] {
        if i + width <= tokens.len() {
            let joined = tokens[i..i + width].join(".");
            if let Some(attr) = classify(&joined) {
                return Some((attr, width));
            }
        }
    }

    if let Some(year) = parse_year(tokens[i]) {
        return Some((Attr::Year(year), 1));
    }

    classify(tokens[i]).map(|attr| (attr, 1))
}

/// Index of the first strong attribute after the leading title word.
fn find_anchor(tokens: &[&str]) -> Option<usize> {
    for i in 1..tokens.len() {
        let Some((attr, _)) = match_at(tokens, i) else {
            continue;
        };
        if attr.is_weak() {
            continue;
        }
        // A year directly followed by another year is part of the title.
        if matches!(attr, Attr::Year(_)) && i + 1 < tokens.len() && parse_year(tokens[i + 1]).is_some() {
            continue;
        }
        return Some(i);
    }
    None
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    let idx = name.rfind('.')?;
    let ext = &name[idx + 1..];
    EXTENSIONS
        .contains(&ext)
        .then(|| (&name[..idx], ext))
}

fn split_group(name: &str) -> Option<(&str, &str)> {
    let idx = name.rfind('-')?;
    let group = &name[idx + 1..];
    if group.is_empty() || group.contains([' ', '.', '_']) {
        return None;
    }

    let stem = &name[..idx];
    let previous = stem.rsplit([' ', '.', '_']).next().unwrap_or("");
    if previous.is_empty() {
        return None;
    }
    // WEB-DL, DTS-HD and friends are tags, not a group suffix.
    if classify(&format!("{}-{}", previous, group)).is_some() {
        return None;
    }

    Some((stem, group))
}

impl ReleaseParser for SceneParser {
    fn parse(&self, name: &str) -> Release {
        let mut release = Release::default();

        let cleaned: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '[' | ']' | '(' | ')' | '{' | '}' => ' ',
                other => other,
            })
            .collect();
        let mut rest = cleaned.trim();

        if let Some((stem, ext)) = split_extension(rest) {
            release.ext = ext.to_string();
            rest = stem;
        }
        if let Some((stem, group)) = split_group(rest) {
            release.group = group.to_string();
            rest = stem;
        }

        let tokens: Vec<&str> = rest
            .split([' ', '.', '_'])
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return release;
        }

        let mut title_end = find_anchor(&tokens).unwrap_or(tokens.len());
        while title_end > 1 {
            match classify(tokens[title_end - 1]) {
                Some(attr) if attr.is_weak() => title_end -= 1,
                _ => break,
            }
        }
        release.title = tokens[..title_end].join(" ");

        let mut i = title_end;
        while i < tokens.len() {
            match match_at(&tokens, i) {
                Some((attr, width)) => {
                    attr.apply(&mut release);
                    i += width;
                }
                None => i += 1,
            }
        }

        release
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Release {
        SceneParser.parse(name)
    }

    #[test]
    fn test_parse_episode() {
        let r = parse("Show.S01E01.1080p.WEB-DL");
        assert_eq!(r.title, "Show");
        assert_eq!(r.series, 1);
        assert_eq!(r.episode, 1);
        assert_eq!(r.resolution, "1080p");
        assert_eq!(r.source, "WEB-DL");
        assert!(r.group.is_empty());
    }

    #[test]
    fn test_parse_movie_with_group_and_audio() {
        let r = parse("The.Movie.2020.2160p.UHD.BluRay.DTS-HD.MA.5.1.HDR10.x265-GRP");
        assert_eq!(r.title, "The Movie");
        assert_eq!(r.year, 2020);
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "UHD.BluRay");
        assert!(r.audio.contains("DTS-HD.MA"));
        assert_eq!(r.channels, "5.1");
        assert!(r.hdr.contains("HDR10"));
        assert!(r.codec.contains("x265"));
        assert_eq!(r.group, "GRP");
    }

    #[test]
    fn test_parse_attached_channels() {
        let r = parse("Show.S02E10.720p.WEB.DDP5.1.Atmos.H.264-NTb");
        assert_eq!(r.series, 2);
        assert_eq!(r.episode, 10);
        assert_eq!(r.source, "WEB");
        assert!(r.audio.contains("DDP"));
        assert!(r.audio.contains("Atmos"));
        assert_eq!(r.channels, "5.1");
        assert!(r.codec.contains("H.264"));
        assert_eq!(r.group, "NTb");
    }

    #[test]
    fn test_parse_extension() {
        let r = parse("Movie.2019.1080p.BluRay.x264-GRP.mkv");
        assert_eq!(r.ext, "mkv");
        assert_eq!(r.group, "GRP");
        assert_eq!(r.title, "Movie");
    }

    #[test]
    fn test_uppercase_ts_is_a_source_not_an_extension() {
        let r = parse("Movie.2019.720p.TS");
        assert_eq!(r.source, "TS");
        assert!(r.ext.is_empty());
    }

    #[test]
    fn test_parse_daily_show_date() {
        let r = parse("Talk.Show.2023.05.17.Guest.720p.HDTV.x264-GRP");
        assert_eq!(r.title, "Talk Show");
        assert_eq!(r.year, 2023);
        assert_eq!(r.month, 5);
        assert_eq!(r.day, 17);
    }

    #[test]
    fn test_language_word_inside_title_is_kept() {
        let r = parse("The.French.Connection.1971.1080p.BluRay");
        assert_eq!(r.title, "The French Connection");
        assert!(r.language.is_empty());
    }

    #[test]
    fn test_trailing_weak_tags_are_peeled_from_title() {
        let r = parse("Movie.EXTENDED.2010.1080p.BluRay.x264-GRP");
        assert_eq!(r.title, "Movie");
        assert!(r.other.contains("EXTENDED"));
    }

    #[test]
    fn test_numeric_title_keeps_first_year() {
        let r = parse("2012.2009.1080p.BluRay");
        assert_eq!(r.title, "2012");
        assert_eq!(r.year, 2009);
    }

    #[test]
    fn test_parse_tags_after_title() {
        let r = parse("Movie.2018.FRENCH.PROPER.Directors.Cut.1080p.WEBRip.AAC2.0-GRP");
        assert!(r.language.contains("FRENCH"));
        assert!(r.other.contains("PROPER"));
        assert!(r.cut.contains("Directors.Cut"));
        assert_eq!(r.source, "WEBRiP");
        assert!(r.audio.contains("AAC"));
        assert_eq!(r.channels, "2.0");
    }

    #[test]
    fn test_hyphenated_title_has_no_group() {
        let r = parse("Spider-Man.2002.1080p.BluRay");
        assert_eq!(r.title, "Spider-Man");
        assert!(r.group.is_empty());
    }

    #[test]
    fn test_cross_episode_notation() {
        let r = parse("Show 1x02 HDTV");
        assert_eq!(r.series, 1);
        assert_eq!(r.episode, 2);
        assert_eq!(r.source, "HDTV");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(parse("   "), Release::default());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let name = "Show.S01E01.1080p.WEB-DL.DDP5.1-GRP";
        assert_eq!(parse(name), parse(name));
    }
}
