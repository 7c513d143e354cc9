use std::borrow::Cow;
use std::fmt::Write;

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::DbError;

mod scanner;

use scanner::{State, closes_dollar_quote, dollar_quote_at, is_pair, scan_digits};

/// Native parameter marker of a driver.
///
/// Statements handed to the helpers always use the portable `?` token; it is
/// rewritten to one of these before the driver sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// Anonymous `?` markers (left as written).
    Question,
    /// SQLite-style numbered markers `?1`, `?2`, ...
    Sqlite,
    /// PostgreSQL-style markers `$1`, `$2`, ...
    Postgres,
    /// Format-style `%s` markers used by MySQL drivers; literal `%` is doubled.
    Format,
}

/// A statement with its placeholders rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated<'a> {
    pub sql: Cow<'a, str>,
    /// Number of portable `?` tokens found, in left-to-right order.
    pub placeholders: usize,
}

/// Rewrite every portable `?` token into the `target` marker.
///
/// Tokens inside quoted strings, quoted identifiers, comments, and dollar-quoted
/// blocks are left alone. Numbered tokens such as `?2` are rejected because the
/// portable form is strictly positional.
///
/// ```rust
/// use sql_scope::prelude::*;
///
/// let t = translate_placeholders("select * from t where a = ? and b = '?'", PlaceholderStyle::Postgres)?;
/// assert_eq!(t.sql, "select * from t where a = $1 and b = '?'");
/// assert_eq!(t.placeholders, 1);
/// # Ok::<(), DbError>(())
/// ```
///
/// # Errors
/// Returns `DbError::ParameterError` when a numbered `?N` token is found.
pub fn translate_placeholders(
    sql: &str,
    target: PlaceholderStyle,
) -> Result<Translated<'_>, DbError> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut placeholders = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];

        if b == b'%' && target == PlaceholderStyle::Format {
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
            buf.push_str(&sql[copied_to..=idx]);
            buf.push('%');
            copied_to = idx + 1;
            idx += 1;
            continue;
        }

        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                _ if is_pair(bytes, idx, b'-', b'-') => state = State::LineComment,
                _ if is_pair(bytes, idx, b'/', b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, close)) = dollar_quote_at(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = close;
                    }
                }
                b'?' => {
                    if scan_digits(bytes, idx + 1).is_some() {
                        return Err(DbError::ParameterError(format!(
                            "numbered placeholder at byte {idx}; use positional `?` tokens"
                        )));
                    }
                    placeholders += 1;
                    if target != PlaceholderStyle::Question {
                        let buf =
                            out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                        buf.push_str(&sql[copied_to..idx]);
                        push_marker(buf, target, placeholders);
                        copied_to = idx + 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted | State::BacktickQuoted => {
                let quote = match state {
                    State::SingleQuoted => b'\'',
                    State::DoubleQuoted => b'"',
                    _ => b'`',
                };
                if closes_quote(bytes, &mut idx, quote) {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_pair(bytes, idx, b'/', b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_pair(bytes, idx, b'*', b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }

        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    Ok(Translated { sql, placeholders })
}

/// Whether the byte at `idx` ends a quoted region; a doubled quote is an escape and is skipped.
fn closes_quote(bytes: &[u8], idx: &mut usize, quote: u8) -> bool {
    if bytes[*idx] != quote {
        return false;
    }
    if bytes.get(*idx + 1) == Some(&quote) {
        *idx += 1;
        false
    } else {
        true
    }
}

fn push_marker(buf: &mut String, target: PlaceholderStyle, position: usize) {
    // writing to a String cannot fail
    let _ = match target {
        PlaceholderStyle::Question => write!(buf, "?"),
        PlaceholderStyle::Sqlite => write!(buf, "?{position}"),
        PlaceholderStyle::Postgres => write!(buf, "${position}"),
        PlaceholderStyle::Format => write!(buf, "%s"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_sqlite_markers_left_to_right() {
        let t = translate_placeholders(
            "insert into t (a, b) values (?, ?)",
            PlaceholderStyle::Sqlite,
        )
        .unwrap();
        assert_eq!(t.sql, "insert into t (a, b) values (?1, ?2)");
        assert_eq!(t.placeholders, 2);
    }

    #[test]
    fn format_style_doubles_percent() {
        let t = translate_placeholders(
            "select * from t where name like 'a%' and id = ?",
            PlaceholderStyle::Format,
        )
        .unwrap();
        assert_eq!(t.sql, "select * from t where name like 'a%%' and id = %s");
    }

    #[test]
    fn skips_literals_comments_and_dollar_blocks() {
        let sql = "select '?', \"?\", `?` -- ?\n/* ? /* ? */ ? */ $f$ ? $f$, ? from t";
        let t = translate_placeholders(sql, PlaceholderStyle::Postgres).unwrap();
        assert_eq!(
            t.sql,
            "select '?', \"?\", `?` -- ?\n/* ? /* ? */ ? */ $f$ ? $f$, $1 from t"
        );
        assert_eq!(t.placeholders, 1);
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let t = translate_placeholders("select 'it''s ?' , ?", PlaceholderStyle::Sqlite).unwrap();
        assert_eq!(t.sql, "select 'it''s ?' , ?1");
    }

    #[test]
    fn question_style_borrows_and_counts() {
        let sql = "update t set a = ? where b = ?";
        let t = translate_placeholders(sql, PlaceholderStyle::Question).unwrap();
        assert!(matches!(t.sql, Cow::Borrowed(_)));
        assert_eq!(t.placeholders, 2);
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let t = translate_placeholders("select 'ü' as x, ? as y", PlaceholderStyle::Postgres)
            .unwrap();
        assert_eq!(t.sql, "select 'ü' as x, $1 as y");
    }

    #[test]
    fn rejects_numbered_tokens() {
        let err = translate_placeholders("select ?1", PlaceholderStyle::Sqlite).unwrap_err();
        assert!(matches!(err, DbError::ParameterError(_)));
    }
}
