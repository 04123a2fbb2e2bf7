//! Virtual path helpers.
//!
//! Every path that reaches the store goes through [`normalize`] first. The
//! normalized form uses forward slashes only, never contains `//`, and never
//! ends in `/` unless it is the bare root `/`.

pub const ROOT: &str = "/";

pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    if out.is_empty() {
        ROOT.to_string()
    } else {
        out
    }
}

/// Directory that `list` groups a record under. `C:/Windows` lives in `C:`,
/// while `C:` itself and `/foo` live in the root.
pub fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        normalize(&format!("/{name}"))
    } else {
        normalize(&format!("{dir}/{name}"))
    }
}

pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// `C:` style drive roots have no record of their own but can still be browsed.
pub fn is_drive_root(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

pub fn is_absolute(path: &str) -> bool {
    let p = path.replace('\\', "/");
    p.starts_with('/') || p.get(..2).is_some_and(is_drive_root)
}

/// Swap the `from` prefix of `path` for `to`. Used to rewrite descendants
/// during a move.
pub fn rebase(path: &str, from: &str, to: &str) -> String {
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

pub fn display(path: &str) -> String {
    if is_drive_root(path) {
        format!("{path}/")
    } else {
        path.to_string()
    }
}

/// Breadcrumb segments as `(label, path)` pairs.
pub fn segments(path: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut acc = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if acc.is_empty() {
            acc.push_str(part);
        } else {
            acc.push('/');
            acc.push_str(part);
        }
        out.push((part.to_string(), acc.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_converts_backslashes_and_collapses_runs() {
        assert_eq!(normalize("C:\\Windows\\\\System32\\"), "C:/Windows/System32");
        assert_eq!(normalize("C://Users///Default/"), "C:/Users/Default");
    }

    #[test]
    fn normalize_keeps_root_and_maps_empty_to_root() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("C:/"), "C:");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "C:\\Windows\\",
            "//a//b//",
            "",
            "C:/Program Files (x86)/Microsoft",
            "\\\\server\\share\\",
            "relative/path/",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn parent_of_matches_listing_rules() {
        assert_eq!(parent_of("C:/Windows/System32"), "C:/Windows");
        assert_eq!(parent_of("C:/Windows"), "C:");
        assert_eq!(parent_of("C:"), "/");
        assert_eq!(parent_of("/foo"), "/");
    }

    #[test]
    fn descendant_check_requires_separator() {
        assert!(is_descendant("C:/Temp/a", "C:/Temp"));
        assert!(!is_descendant("C:/Temp2/a", "C:/Temp"));
        assert!(!is_descendant("C:/Temp", "C:/Temp"));
    }

    #[test]
    fn rebase_swaps_prefix_only() {
        assert_eq!(rebase("C:/a/b/c", "C:/a", "C:/z"), "C:/z/b/c");
        assert_eq!(rebase("C:/q", "C:/a", "C:/z"), "C:/q");
    }

    #[test]
    fn segments_accumulate_paths() {
        let segs = segments("C:/Users/Default");
        assert_eq!(
            segs,
            vec![
                ("C:".to_string(), "C:".to_string()),
                ("Users".to_string(), "C:/Users".to_string()),
                ("Default".to_string(), "C:/Users/Default".to_string()),
            ]
        );
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("C:/Windows"));
        assert!(is_absolute("c:\\x"));
        assert!(is_absolute("/tmp"));
        assert!(!is_absolute("Desktop"));
        assert!(!is_absolute("../x"));
    }
}
