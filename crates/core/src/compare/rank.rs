//! Token rank tables.

use std::collections::BTreeSet;

use tracing::warn;

use crate::metrics;
use crate::release::Release;

const HDR: &[(&str, i32)] = &[
    ("DoVi", 90),
    ("DV", 90),
    ("HDR10+", 89),
    ("HDR10", 88),
    ("HDR+", 87),
    ("HDR", 86),
    ("HLG", 85),
    ("SDR", 84),
];

const SOURCE: &[(&str, i32)] = &[
    ("WEB-DL", 90),
    ("UHD.BluRay", 89),
    ("BluRay", 88),
    ("WEB", 87),
    ("WEBRiP", 86),
    ("BDRiP", 85),
    ("HDRiP", 84),
    ("HDTV", 83),
    ("DVDRiP", 82),
    ("HDTC", 81),
    ("HDTS", 80),
    ("TC", 79),
    ("VHSRiP", 78),
    ("WORKPRiNT", 77),
    ("TS", 76),
    ("HDCAM", 75),
    ("CAM", 74),
];

const AUDIO: &[(&str, i32)] = &[
    ("FLAC", 94),
    ("LPCM", 93),
    ("DTS-X", 92),
    ("DTS-HD.HRA", 91),
    ("DDPA", 90),
    ("TrueHD", 89),
    ("DTS-HD.MA", 88),
    ("DTS-MA", 87),
    ("DTS-HD.HR", 86),
    ("Atmos", 85),
    ("DTS-HD", 84),
    ("DDP", 83),
    ("DTS", 82),
    ("DD", 81),
    ("OPUS", 80),
    ("AAC", 79),
    ("DUAL.AUDIO", 70),
];

const EXTENSION: &[(&str, i32)] = &[
    ("mkv", 90),
    ("mp4", 89),
    ("webp", 88),
    ("ts", 87),
    ("wmv", 86),
    ("xvid", 85),
    ("divx", 84),
];

const LANGUAGE: &[(&str, i32)] = &[
    ("ENGLiSH", 20),
    ("MULTi", 19),
    ("FRENCH", 18),
    ("SWEDiSH", 17),
    ("SWESUB", 16),
    ("NORWEGiAN", 15),
    ("NORDiCSUBS", 14),
    ("DUBBED", 13),
    ("DANiSH", 12),
    ("HiNDI", 11),
    ("NORDiC", 10),
    ("GERMAN", 9),
    ("SUBBED", 8),
    ("CZECH", 7),
    ("RUSSiAN", 1),
];

const REPLACEMENT: &[(&str, i32)] = &[
    ("COMPLETE", 1),
    ("REMUX", 2),
    ("FS", 3),
    ("EXTENDED", 4),
    ("REMASTERED", 5),
    ("PROPER", 6),
    ("REPACK", 7),
    ("INTERNAL", 8),
];

const SDR: i32 = 84;
const DEFAULT_SOURCE: i32 = 76;
const DEFAULT_AUDIO: i32 = 70;
const DEFAULT_EXTENSION: i32 = 84;
const EMPTY_LANGUAGE: i32 = 20;
const DEFAULT_RESOLUTION: i32 = 480;
const DEFAULT_CHANNELS: i32 = 20;

fn score(table: &[(&str, i32)], token: &str) -> Option<i32> {
    table
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, rank)| *rank)
}

fn best(table: &[(&str, i32)], tokens: &BTreeSet<String>) -> Option<i32> {
    tokens.iter().filter_map(|t| score(table, t)).max()
}

fn flag_unknown(comparator: &'static str, token: &str) {
    warn!(comparator, token, "Unrecognised release token");
    metrics::UNKNOWN_TOKENS
        .with_label_values(&[comparator])
        .inc();
}

fn flag_unknown_set(comparator: &'static str, tokens: &BTreeSet<String>) {
    let joined = tokens.iter().cloned().collect::<Vec<_>>().join(",");
    flag_unknown(comparator, &joined);
}

/// Leading decimal digits of a token, e.g. `1080p` -> 1080.
fn leading_number(token: &str) -> Option<i32> {
    let digits: String = token
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub(super) fn resolution(release: &Release) -> i32 {
    match leading_number(&release.resolution) {
        Some(height) if height > 0 => height,
        _ => DEFAULT_RESOLUTION,
    }
}

pub(super) fn hdr(release: &Release) -> i32 {
    match best(HDR, &release.hdr) {
        Some(rank) => rank,
        None => {
            if !release.hdr.is_empty() {
                flag_unknown_set("hdr", &release.hdr);
            }
            SDR
        }
    }
}

pub(super) fn channels(release: &Release) -> i32 {
    match release.channels.trim().parse::<f64>() {
        Ok(layout) if layout > 0.0 => (layout * 10.0).round() as i32,
        _ => DEFAULT_CHANNELS,
    }
}

pub(super) fn source(release: &Release) -> i32 {
    match score(SOURCE, &release.source) {
        Some(rank) => rank,
        None => {
            if !release.source.is_empty() {
                flag_unknown("source", &release.source);
            }
            DEFAULT_SOURCE
        }
    }
}

pub(super) fn audio(release: &Release) -> i32 {
    match best(AUDIO, &release.audio) {
        Some(rank) => rank,
        None => {
            if !release.audio.is_empty() {
                flag_unknown_set("audio", &release.audio);
            }
            DEFAULT_AUDIO
        }
    }
}

pub(super) fn extension(release: &Release) -> i32 {
    match score(EXTENSION, &release.ext) {
        Some(rank) => rank,
        None => {
            if !release.ext.is_empty() {
                flag_unknown("extension", &release.ext);
            }
            DEFAULT_EXTENSION
        }
    }
}

pub(super) fn language(release: &Release) -> i32 {
    if release.language.is_empty() {
        return EMPTY_LANGUAGE;
    }
    match best(LANGUAGE, &release.language) {
        Some(rank) => rank,
        None => {
            flag_unknown_set("language", &release.language);
            0
        }
    }
}

pub(super) fn replacement(release: &Release) -> i32 {
    match best(REPLACEMENT, &release.other) {
        Some(rank) => rank,
        None => {
            if !release.other.is_empty() {
                flag_unknown_set("replacement", &release.other);
            }
            0
        }
    }
}
