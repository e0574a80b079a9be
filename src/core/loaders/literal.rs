// ─── Literal Grammar ───
// `{var}`, `'text'`, `[path]` and escaped plain text, as used by installer
// profiles and processor argument lists.

use std::collections::HashMap;
use std::path::Path;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

/// Parse one literal.
///
/// - `{key}` → `vars[key]`, `None` when the key is absent
/// - `'text'` → `text` verbatim
/// - `[path]` → `<base_dir>/libraries/<path>`; a maven coordinate is mapped
///   to its repository path first
/// - anything else → [`replace_tokens`], then `plain_converter`
pub fn parse_literal<F>(
    base_dir: &Path,
    literal: &str,
    vars: &HashMap<String, String>,
    plain_converter: F,
) -> LauncherResult<Option<String>>
where
    F: FnOnce(String) -> LauncherResult<String>,
{
    if let Some(key) = surrounded_by(literal, '{', '}') {
        return Ok(vars.get(key).cloned());
    }

    if let Some(text) = surrounded_by(literal, '\'', '\'') {
        return Ok(Some(text.to_string()));
    }

    if let Some(path) = surrounded_by(literal, '[', ']') {
        let relative = match MavenArtifact::parse(path) {
            Ok(artifact) => artifact.relative_path(),
            Err(_) => path.to_string(),
        };
        let resolved = base_dir.join("libraries").join(relative);
        return Ok(Some(absolute(&resolved)));
    }

    let replaced = replace_tokens(vars, literal)?;
    plain_converter(replaced).map(Some)
}

/// [`parse_literal`] with the identity converter.
pub fn parse_literal_plain(
    base_dir: &Path,
    literal: &str,
    vars: &HashMap<String, String>,
) -> LauncherResult<Option<String>> {
    parse_literal(base_dir, literal, vars, Ok)
}

/// Substitute `{key}` tokens and unquote `'…'` runs inside a plain string.
///
/// A backslash escapes the following character. Unclosed `{`/`'`, a trailing
/// backslash or a key missing from `tokens` are errors.
pub fn replace_tokens(tokens: &HashMap<String, String>, value: &str) -> LauncherResult<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut buf = String::with_capacity(value.len());
    let mut x = 0;

    while x < chars.len() {
        let c = chars[x];
        match c {
            '\\' => {
                x += 1;
                let escaped = chars.get(x).ok_or_else(|| bad_escape(value))?;
                buf.push(*escaped);
            }
            '{' | '\'' => {
                let close = if c == '{' { '}' } else { '\'' };
                let mut key = String::new();
                let mut y = x + 1;
                loop {
                    let Some(&d) = chars.get(y) else {
                        return Err(LauncherError::Literal {
                            pattern: value.to_string(),
                            reason: format!("Unclosed {}", c),
                        });
                    };
                    if d == '\\' {
                        y += 1;
                        let escaped = chars.get(y).ok_or_else(|| bad_escape(value))?;
                        key.push(*escaped);
                    } else if d == close {
                        break;
                    } else {
                        key.push(d);
                    }
                    y += 1;
                }
                x = y;

                if c == '\'' {
                    buf.push_str(&key);
                } else {
                    let replacement =
                        tokens
                            .get(&key)
                            .ok_or_else(|| LauncherError::MissingVariable {
                                key: key.clone(),
                                pattern: value.to_string(),
                            })?;
                    buf.push_str(replacement);
                }
            }
            _ => buf.push(c),
        }
        x += 1;
    }

    Ok(buf)
}

/// `--name value` pairs in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorOptions(Vec<(String, String)>);

impl ProcessorOptions {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn set(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }
}

/// Scan a flat argument list for `--name value` options.
///
/// A name followed by another `--name` (or by nothing) maps to `""`. Values
/// go through [`parse_literal`]; a `{key}` naming an absent variable is an
/// error here.
pub fn parse_options(
    base_dir: &Path,
    args: &[String],
    vars: &HashMap<String, String>,
) -> LauncherResult<ProcessorOptions> {
    let mut options = ProcessorOptions::default();
    let mut option_name: Option<String> = None;

    for arg in args {
        if let Some(name) = arg.strip_prefix("--") {
            if let Some(open) = option_name.take() {
                options.set(open, String::new());
            }
            option_name = Some(name.to_string());
        } else if let Some(name) = option_name.take() {
            let value = parse_literal_plain(base_dir, arg, vars)?.ok_or_else(|| {
                LauncherError::MissingVariable {
                    key: arg.trim_matches(|c| c == '{' || c == '}').to_string(),
                    pattern: arg.clone(),
                }
            })?;
            options.set(name, value);
        }
    }

    if let Some(open) = option_name {
        options.set(open, String::new());
    }

    Ok(options)
}

fn surrounded_by(literal: &str, open: char, close: char) -> Option<&str> {
    if literal.len() < 2 {
        return None;
    }
    literal.strip_prefix(open)?.strip_suffix(close)
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn bad_escape(pattern: &str) -> LauncherError {
    LauncherError::Literal {
        pattern: pattern.to_string(),
        reason: "Bad escape".to_string(),
    }
}
