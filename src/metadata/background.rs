//! Background frame naming and lookup
//!
//! A background frame is stored next to the measurement images as
//! `<prefix>_<exposure>[_<gain or polarization>].<ext>`, where a fractional
//! exposure such as `1/30` is written `1_30`.

use super::filename::AcquisitionInfo;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn name_part(part: &str) -> String {
    if part.is_empty() {
        String::new()
    } else {
        format!("_{}", part.replace('/', "_"))
    }
}

/// Background file stem for the given settings
pub fn background_file_name(prefix: &str, exposure: &str, gain: &str) -> String {
    format!("{}{}{}", prefix, name_part(exposure), name_part(gain))
}

/// Whether `file_name` is a background frame for an image taken with `info`
///
/// The extension must equal `extension` (with or without the leading dot).
/// Stem tokens 1 and 2 joined by `/` must equal the exposure; then either
/// the stem has exactly three tokens, or its fourth token is the
/// polarization or the gain.
pub fn is_background_file(file_name: &str, extension: &str, info: &AcquisitionInfo) -> bool {
    let path = Path::new(file_name);
    let wanted = extension.trim_start_matches('.');
    let same_extension = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext == wanted,
        None => wanted.is_empty(),
    };
    if !same_extension {
        return false;
    }

    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let parts: Vec<&str> = stem.split('_').collect();
    let exposure = info.exposure.as_deref().unwrap_or("");
    let joined = parts.iter().skip(1).take(2).copied().collect::<Vec<_>>().join("/");
    if joined != exposure {
        return false;
    }

    match parts.len() {
        3 => true,
        n if n > 3 => {
            let fourth = parts[3];
            fourth == info.polarization.as_deref().unwrap_or("")
                || fourth == info.gain.as_deref().unwrap_or("")
        }
        _ => false,
    }
}

/// Background frames in `dir` matching `info`, sorted by file name
///
/// A directory that cannot be listed yields no candidates.
pub fn find_background_files(dir: &Path, extension: &str, info: &AcquisitionInfo) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list background candidates");
            return Vec::new();
        }
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| is_background_file(name, extension, info))
        })
        .map(|entry| entry.path())
        .collect();
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "background candidates");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquisition(exposure: &str, gain: &str, polarization: &str) -> AcquisitionInfo {
        let opt = |v: &str| (!v.is_empty()).then(|| v.to_string());
        AcquisitionInfo {
            exposure: opt(exposure),
            gain: opt(gain),
            polarization: opt(polarization),
            ..AcquisitionInfo::default()
        }
    }

    #[test]
    fn test_background_file_name() {
        assert_eq!(background_file_name("bg", "1/30", "2"), "bg_1_30_2");
        assert_eq!(background_file_name("bg", "1/30", ""), "bg_1_30");
        assert_eq!(background_file_name("bg", "", ""), "bg");
    }

    #[test]
    fn test_matches_exposure_only() {
        let info = acquisition("1/30", "2", "s");
        assert!(is_background_file("bg_1_30.png", ".png", &info));
        assert!(is_background_file("bg_1_30.png", "png", &info));
        assert!(!is_background_file("bg_1_30.jpg", ".png", &info));
        assert!(!is_background_file("bg_1_60.png", ".png", &info));
    }

    #[test]
    fn test_matches_gain_or_polarization() {
        let info = acquisition("1/30", "2", "s");
        assert!(is_background_file("bg_1_30_2.png", ".png", &info));
        assert!(is_background_file("bg_1_30_s.png", ".png", &info));
        assert!(!is_background_file("bg_1_30_4.png", ".png", &info));
    }

    #[test]
    fn test_short_stems_never_match() {
        let info = acquisition("", "", "");
        assert!(!is_background_file("bg.png", ".png", &info));
        let info = acquisition("30", "", "");
        assert!(!is_background_file("bg_30.png", ".png", &info));
    }

    #[test]
    fn test_find_background_files() {
        let dir = std::env::temp_dir().join(format!("ring_reflectivity_bg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["bg_1_30_2.png", "bg_1_30.png", "650nm_45.png", "bg_1_30.bmp"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let found = find_background_files(&dir, ".png", &acquisition("1/30", "2", "s"));
        std::fs::remove_dir_all(&dir).ok();

        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["bg_1_30.png", "bg_1_30_2.png"]);
    }

    #[test]
    fn test_missing_directory_has_no_candidates() {
        let found = find_background_files(Path::new("/nonexistent/dir"), ".png", &AcquisitionInfo::default());
        assert!(found.is_empty());
    }
}
