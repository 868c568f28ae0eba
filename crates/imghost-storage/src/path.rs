//! Object key generation from an engine's path rule.
//!
//! A rule is a `/`-separated template such as
//! `uploads/{date}/{filename}.{ext}`. Supported placeholders are `{date}`
//! (`YYYYMMDD`), `{year}`, `{month}`, `{day}`, `{filename}`, `{ext}`,
//! `{md5}` and `{sha256}`. Anything else in braces is rejected.

use chrono::{DateTime, Datelike, Utc};

use imghost_core::{AppError, AppResult, ErrorCode};

/// Values substituted into a path rule.
#[derive(Debug, Clone)]
pub struct PathVars<'a> {
    /// Base name of the stored object (the content MD5 for uploads).
    pub filename: &'a str,
    /// Lowercase extension without the dot; may be empty.
    pub ext: &'a str,
    pub md5: &'a str,
    pub sha256: &'a str,
    pub date: DateTime<Utc>,
}

const PLACEHOLDERS: [&str; 8] = [
    "date", "year", "month", "day", "filename", "ext", "md5", "sha256",
];

/// Check that `rule` only uses known placeholders and yields a relative key.
pub fn validate_path_rule(rule: &str) -> AppResult<()> {
    let sample = PathVars {
        filename: "f",
        ext: "e",
        md5: "m",
        sha256: "s",
        date: Utc::now(),
    };
    render_path(rule, &sample).map(|_| ())
}

/// Render `rule` into an object key.
pub fn render_path(rule: &str, vars: &PathVars<'_>) -> AppResult<String> {
    if rule.trim().is_empty() {
        return Err(invalid_rule("path rule must not be empty"));
    }

    let mut out = String::with_capacity(rule.len() + 64);
    let mut rest = rule;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| invalid_rule(&format!("unterminated placeholder in '{rule}'")))?;
        let name = &after[..close];
        match name {
            "date" => out.push_str(&vars.date.format("%Y%m%d").to_string()),
            "year" => out.push_str(&format!("{:04}", vars.date.year())),
            "month" => out.push_str(&format!("{:02}", vars.date.month())),
            "day" => out.push_str(&format!("{:02}", vars.date.day())),
            "filename" => out.push_str(vars.filename),
            "ext" => out.push_str(vars.ext),
            "md5" => out.push_str(vars.md5),
            "sha256" => out.push_str(vars.sha256),
            other => {
                return Err(invalid_rule(&format!(
                    "unknown placeholder '{{{other}}}', expected one of: {}",
                    PLACEHOLDERS.join(", ")
                )));
            }
        }
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(invalid_rule(&format!("unbalanced '}}' in '{rule}'")));
    }
    out.push_str(rest);

    let key = out.trim_matches('/').trim_end_matches('.').to_string();
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(invalid_rule(&format!("'{rule}' does not produce a usable key")));
    }
    Ok(key)
}

/// Pick the stored extension: the original filename's, else one derived
/// from the MIME type.
pub fn extension_for(original_filename: &str, content_type: &str) -> String {
    let from_name = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }

    match content_type.split_once('/').map(|(_, subtype)| subtype) {
        Some("jpeg") | Some("pjpeg") => "jpg".to_string(),
        Some("svg+xml") => "svg".to_string(),
        Some(subtype) => subtype
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase(),
        None => String::new(),
    }
}

fn invalid_rule(detail: &str) -> AppError {
    AppError::validation(format!("Invalid path rule: {detail}")).with_code(ErrorCode::InvalidPathRule)
}
