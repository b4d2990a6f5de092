// Statement model: author once with `%s`, render per dialect
//
// Statements are tokenised instead of rewritten with string replacement, so a
// `%s` inside a quoted literal or a comment is never treated as a placeholder.

use super::SqlValue;
use crate::error::{AppError, Result};
use std::fmt;

/// Relational dialect of the active backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Primary network backend
    MySql,
    /// Embedded-file fallback backend
    Sqlite,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Sqlite => format!("?{}", index),
        }
    }

    fn now(&self) -> &'static str {
        match self {
            Dialect::MySql => "NOW()",
            Dialect::Sqlite => "datetime('now', 'localtime')",
        }
    }

    fn current_date(&self) -> &'static str {
        match self {
            Dialect::MySql => "CURDATE()",
            Dialect::Sqlite => "date('now', 'localtime')",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Param,
    Now,
    CurrentDate,
}

/// A parsed statement authored in the primary dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    source: String,
    segments: Vec<Segment>,
    param_count: usize,
}

impl Statement {
    pub fn parse(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let len = chars.len();
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < len {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            match c {
                '\'' | '"' | '`' => {
                    let end = scan_quoted(&chars, i, c);
                    text.extend(&chars[i..end]);
                    i = end;
                }
                '-' if next == Some('-') => {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| ch == '\n')
                        .map_or(len, |p| i + p);
                    text.extend(&chars[i..end]);
                    i = end;
                }
                '/' if next == Some('*') => {
                    let end = (i + 2..len.saturating_sub(1))
                        .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
                        .map_or(len, |j| j + 2);
                    text.extend(&chars[i..end]);
                    i = end;
                }
                '%' if next == Some('s') => {
                    flush(&mut text, &mut segments);
                    segments.push(Segment::Param);
                    i += 2;
                }
                '%' if next == Some('%') => {
                    text.push('%');
                    i += 2;
                }
                c if is_ident_start(c) => {
                    let end = (i..len)
                        .find(|&j| !is_ident_char(chars[j]))
                        .unwrap_or(len);
                    let word: String = chars[i..end].iter().collect();
                    match function_call(&chars, end, &word) {
                        Some((segment, after)) => {
                            flush(&mut text, &mut segments);
                            segments.push(segment);
                            i = after;
                        }
                        None => {
                            text.push_str(&word);
                            i = end;
                        }
                    }
                }
                c if is_ident_char(c) => {
                    // digits glued to a following word must not start a function name
                    let end = (i..len)
                        .find(|&j| !is_ident_char(chars[j]))
                        .unwrap_or(len);
                    text.extend(&chars[i..end]);
                    i = end;
                }
                _ => {
                    text.push(c);
                    i += 1;
                }
            }
        }
        flush(&mut text, &mut segments);

        let param_count = segments.iter().filter(|s| **s == Segment::Param).count();
        Self {
            source: source.to_string(),
            segments,
            param_count,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Case-insensitive substring check on the raw text
    pub fn has_limit(&self) -> bool {
        self.source.to_uppercase().contains("LIMIT")
    }

    pub fn render(&self, dialect: Dialect) -> String {
        let mut out = String::with_capacity(self.source.len() + self.param_count * 2);
        let mut index = 0;
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param => {
                    index += 1;
                    out.push_str(&dialect.placeholder(index));
                }
                Segment::Now => out.push_str(dialect.now()),
                Segment::CurrentDate => out.push_str(dialect.current_date()),
            }
        }
        out
    }

    /// Append `LIMIT %s [OFFSET %s]` unless the statement already limits itself
    ///
    /// Returns the statement to run and the extra parameters to append after
    /// the caller's own.
    pub fn paginate(&self, limit: Option<u64>, offset: Option<u64>) -> (Statement, Vec<SqlValue>) {
        let limit = match limit {
            Some(limit) if !self.has_limit() => limit,
            _ => return (self.clone(), Vec::new()),
        };

        let base = self.source.trim_end().trim_end_matches(';').trim_end();
        let mut source = format!("{} LIMIT %s", base);
        let mut extra = vec![SqlValue::from(limit)];
        if let Some(offset) = offset {
            source.push_str(" OFFSET %s");
            extra.push(SqlValue::from(offset));
        }

        (Statement::parse(&source), extra)
    }

    pub fn check_params(&self, params: &[SqlValue]) -> Result<()> {
        if params.len() != self.param_count {
            return Err(AppError::Statement(format!(
                "Statement expects {} parameter(s) but {} were supplied",
                self.param_count,
                params.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn flush(text: &mut String, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// End index (exclusive) of a quoted literal starting at `start`
fn scan_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut j = start + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == '\\' && quote != '`' {
            j += 2;
            continue;
        }
        if c == quote {
            if chars.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    chars.len()
}

/// `NOW()` / `CURDATE()` with optional inner whitespace
fn function_call(chars: &[char], word_end: usize, word: &str) -> Option<(Segment, usize)> {
    let segment = match word.to_ascii_uppercase().as_str() {
        "NOW" => Segment::Now,
        "CURDATE" => Segment::CurrentDate,
        _ => return None,
    };

    let skip_ws = |mut j: usize| {
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        j
    };

    let open = skip_ws(word_end);
    if chars.get(open) != Some(&'(') {
        return None;
    }
    let close = skip_ws(open + 1);
    if chars.get(close) != Some(&')') {
        return None;
    }
    Some((segment, close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders_per_dialect() {
        let stmt = Statement::parse("SELECT * FROM t WHERE id = %s AND name = %s");
        assert_eq!(stmt.param_count(), 2);
        assert_eq!(
            stmt.render(Dialect::MySql),
            "SELECT * FROM t WHERE id = ? AND name = ?"
        );
        assert_eq!(
            stmt.render(Dialect::Sqlite),
            "SELECT * FROM t WHERE id = ?1 AND name = ?2"
        );
    }

    #[test]
    fn test_placeholder_inside_literal_untouched() {
        let stmt = Statement::parse("SELECT '%s' AS raw, \"a%sb\" AS q FROM t WHERE x = %s");
        assert_eq!(stmt.param_count(), 1);
        assert_eq!(
            stmt.render(Dialect::Sqlite),
            "SELECT '%s' AS raw, \"a%sb\" AS q FROM t WHERE x = ?1"
        );
    }

    #[test]
    fn test_escaped_quotes_and_comments() {
        let stmt = Statement::parse(
            "SELECT 'it''s %s' -- %s in comment\n, /* %s */ x FROM t WHERE y = %s",
        );
        assert_eq!(stmt.param_count(), 1);
        assert!(stmt.render(Dialect::MySql).ends_with("WHERE y = ?"));
    }

    #[test]
    fn test_double_percent_is_literal() {
        let stmt = Statement::parse("SELECT * FROM t WHERE name LIKE 'a%%' OR pct = 100%%");
        assert_eq!(stmt.param_count(), 0);
        // inside the literal the text is kept as written
        assert_eq!(
            stmt.render(Dialect::MySql),
            "SELECT * FROM t WHERE name LIKE 'a%%' OR pct = 100%"
        );
    }

    #[test]
    fn test_time_functions_translated_for_sqlite() {
        let stmt = Statement::parse("SELECT * FROM c WHERE Data_Hora >= NOW( ) AND d = CURDATE()");
        assert_eq!(
            stmt.render(Dialect::Sqlite),
            "SELECT * FROM c WHERE Data_Hora >= datetime('now', 'localtime') AND d = date('now', 'localtime')"
        );
        assert_eq!(
            stmt.render(Dialect::MySql),
            "SELECT * FROM c WHERE Data_Hora >= NOW() AND d = CURDATE()"
        );
    }

    #[test]
    fn test_function_names_need_call_syntax() {
        let stmt = Statement::parse("SELECT now_col, snow() FROM t");
        assert_eq!(stmt.render(Dialect::Sqlite), "SELECT now_col, snow() FROM t");
    }

    #[test]
    fn test_paginate_appends_limit_and_offset() {
        let stmt = Statement::parse("SELECT * FROM tabelapaciente WHERE NomePac LIKE %s ;  ");
        let (paged, extra) = stmt.paginate(Some(10), Some(20));
        assert_eq!(
            paged.source(),
            "SELECT * FROM tabelapaciente WHERE NomePac LIKE %s LIMIT %s OFFSET %s"
        );
        assert_eq!(paged.param_count(), 3);
        assert_eq!(extra, vec![SqlValue::Int(10), SqlValue::Int(20)]);
        assert!(paged.render(Dialect::Sqlite).ends_with("LIMIT ?2 OFFSET ?3"));
    }

    #[test]
    fn test_paginate_never_doubles_limit() {
        let stmt = Statement::parse("SELECT * FROM t ORDER BY id limit 10");
        let (paged, extra) = stmt.paginate(Some(5), Some(5));
        assert_eq!(paged, stmt);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_paginate_without_limit_is_noop() {
        let stmt = Statement::parse("SELECT * FROM t");
        let (paged, extra) = stmt.paginate(None, Some(30));
        assert_eq!(paged.source(), "SELECT * FROM t");
        assert!(extra.is_empty());
    }

    #[test]
    fn test_check_params() {
        let stmt = Statement::parse("DELETE FROM t WHERE a = %s AND b = %s");
        assert!(stmt.check_params(&[SqlValue::Int(1), SqlValue::Int(2)]).is_ok());
        let err = stmt.check_params(&[SqlValue::Int(1)]).unwrap_err();
        assert!(err.to_string().contains("expects 2 parameter(s)"));
    }
}
