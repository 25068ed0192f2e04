use crate::domain::model::Locator;
use std::fmt;
use url::Url;

const FORBIDDEN_CHARS: [char; 8] = ['[', ']', '{', '}', '<', '>', '|', '\\'];
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// 正規化被拒絕的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    ForbiddenCharacter(char),
    Unparseable(String),
    UnsupportedScheme(String),
    MissingHost,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "locator is empty"),
            Rejection::ForbiddenCharacter(c) => write!(f, "locator contains '{}'", c),
            Rejection::Unparseable(reason) => write!(f, "malformed url: {}", reason),
            Rejection::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme '{}' (http:// or https:// only)", scheme)
            }
            Rejection::MissingHost => write!(f, "locator has no host"),
        }
    }
}

/// 將換行分隔的輸入拆成原始位址清單，去除空白行並保留順序
pub fn split_batch_input(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 純語法檢查並產生正規化形式：去除前後空白、scheme 與 authority 轉小寫，
/// path/query/fragment 保持原樣。
pub fn normalize(raw: &str) -> Result<Locator, Rejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }

    if let Some(c) = trimmed.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(Rejection::ForbiddenCharacter(c));
    }

    let parsed = Url::parse(trimmed).map_err(|e| Rejection::Unparseable(e.to_string()))?;

    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Rejection::UnsupportedScheme(parsed.scheme().to_string()));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Rejection::MissingHost);
    }

    // Url 已確認含有 "://"
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or(Rejection::MissingHost)?;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let canonical = format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        tail
    );

    Ok(Locator::from_parts(raw, canonical))
}
