use std::path::{Component, Path, PathBuf};

/// Resolves a blob key below `root`, refusing anything that could escape it.
pub fn resolve_key(root: &Path, key: &str) -> anyhow::Result<PathBuf> {
    let rel = Path::new(key.trim_start_matches('/'));
    if rel.as_os_str().is_empty() {
        anyhow::bail!("empty blob key");
    }
    for comp in rel.components() {
        match comp {
            Component::Normal(_) => {}
            _ => anyhow::bail!("invalid blob key {key:?}"),
        }
    }
    Ok(root.join(rel))
}

/// Public location of `key` under `base` (which may be empty for root-relative URLs).
pub fn public_url(base: &str, key: &str) -> String {
    let key = key
        .trim_start_matches('/')
        .split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Inverse of [`public_url`]; bare keys pass through. URLs under another base
/// yield `None`.
pub fn key_from_url(base: &str, url_or_key: &str) -> Option<String> {
    let raw = url_or_key.trim();
    if raw.is_empty() {
        return None;
    }
    let is_url = raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with('/');
    let rest = if is_url {
        let base = base.trim_end_matches('/');
        raw.strip_prefix(base)?.trim_start_matches('/')
    } else {
        raw
    };
    let decoded = rest
        .split('/')
        .map(|seg| {
            urlencoding::decode(seg)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| seg.to_string())
        })
        .collect::<Vec<_>>()
        .join("/");
    (!decoded.is_empty()).then_some(decoded)
}
