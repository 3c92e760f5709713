/// Structural path parsing
///
/// Inspection datasets place images under a numeric sample folder followed by
/// a fixed four-level layout:
///
/// ```text
/// <prefix>/<number>/<part1>/<unit_group>/<unit>/<type>/<file>
/// /data/test/1/0001/Unit/U12/BC/p0001.bmp
/// ```
///
/// [`parse`] extracts those pieces from either a recorded path or a base
/// directory. It only ever reads the string.
use regex::Regex;
use std::sync::OnceLock;

/// Components found around the first `/<digits>/` segment of a path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuralComponents {
    /// Everything before the anchor, without a trailing slash
    pub prefix: String,
    /// The digits of the anchor segment
    pub sample_number: String,
    pub part1: Option<String>,
    /// Folder between `part1` and the unit folder (usually "Unit")
    pub unit_group: Option<String>,
    pub unit_folder: Option<String>,
    pub type_folder: Option<String>,
    /// Last path segment without its extension
    pub file_base_name: String,
    /// Extension of the last segment, without the dot (may be empty)
    pub extension: String,
}

fn anchor() -> &'static Regex {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    ANCHOR.get_or_init(|| Regex::new(r"/(\d+)/").expect("anchor pattern is valid"))
}

/// Parse `path` around its first `/<digits>/` segment.
///
/// Returns `None` when there is no anchor; callers skip structural matching in
/// that case. The four layout folders are only filled in when at least four
/// segments follow the anchor.
pub fn parse(path: &str) -> Option<StructuralComponents> {
    let normalized = path.replace('\\', "/");
    let caps = anchor().captures(&normalized)?;
    let whole = caps.get(0)?;
    let number = caps.get(1)?.as_str().to_string();

    let prefix = normalized[..whole.start()].to_string();
    let remainder = &normalized[whole.end()..];
    let parts: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();

    let last = normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let (file_base_name, extension) = split_name(last);

    let mut components = StructuralComponents {
        prefix,
        sample_number: number,
        file_base_name,
        extension,
        ..Default::default()
    };

    if parts.len() >= 4 {
        components.part1 = Some(parts[0].to_string());
        components.unit_group = Some(parts[1].to_string());
        components.unit_folder = Some(parts[2].to_string());
        components.type_folder = Some(parts[3].to_string());
    }

    Some(components)
}

/// Split a file name into stem and extension the way `Path` does
/// (a leading dot does not start an extension).
pub fn split_name(name: &str) -> (String, String) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (name[..idx].to_string(), name[idx + 1..].to_string()),
        _ => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_layout() {
        let c = parse("/mnt/line/test/1/0001/Unit/U12/BC/p0001.bmp").unwrap();
        assert_eq!(c.prefix, "/mnt/line/test");
        assert_eq!(c.sample_number, "1");
        assert_eq!(c.part1.as_deref(), Some("0001"));
        assert_eq!(c.unit_group.as_deref(), Some("Unit"));
        assert_eq!(c.unit_folder.as_deref(), Some("U12"));
        assert_eq!(c.type_folder.as_deref(), Some("BC"));
        assert_eq!(c.file_base_name, "p0001");
        assert_eq!(c.extension, "bmp");
    }

    #[test]
    fn test_backslashes_are_normalized() {
        let c = parse(r"D:\line\test\3\0002\Unit\U0\FC\a.jpg").unwrap();
        assert_eq!(c.sample_number, "3");
        assert_eq!(c.unit_folder.as_deref(), Some("U0"));
    }

    #[test]
    fn test_short_remainder_keeps_anchor_only() {
        let c = parse("/data/7/x.png").unwrap();
        assert_eq!(c.sample_number, "7");
        assert_eq!(c.part1, None);
        assert_eq!(c.file_base_name, "x");
    }

    #[test]
    fn test_no_anchor() {
        assert_eq!(parse("cls1/0001.jpg"), None);
        assert_eq!(parse("/data/imgs/a/b.jpg"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("0001.bmp"), ("0001".into(), "bmp".into()));
        assert_eq!(split_name("0001.v2.png"), ("0001.v2".into(), "png".into()));
        assert_eq!(split_name(".hidden"), (".hidden".into(), String::new()));
        assert_eq!(split_name("noext"), ("noext".into(), String::new()));
    }
}
