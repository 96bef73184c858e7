use std::borrow::Cow;

use crate::ast_token;
use crate::syntax::ast::AstToken;

ast_token!(Identifier, Identifier);
ast_token!(Int, Int);
ast_token!(Comment, Comment);
ast_token!(Minus, Minus);
ast_token!(StringLit, String);

impl Int {
    /// Decimal value of the literal, `None` if it does not fit an `i64`.
    pub fn value(&self, negative: bool) -> Option<i64> {
        parse_int(self.text(), negative)
    }
}

pub(crate) fn parse_int(digits: &str, negative: bool) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let magnitude: u64 = digits.parse().ok()?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

impl StringLit {
    pub fn is_raw(&self) -> bool {
        self.text().starts_with(['r', 'R'])
    }

    /// Text between the quotes, before escape processing.
    pub fn raw_contents(&self) -> &str {
        let text = self.text();
        let text = text.trim_start_matches(['r', 'R']);

        let quote_len = if text.starts_with("\"\"\"") || text.starts_with("'''") {
            3
        } else {
            1
        };

        if text.len() < 2 * quote_len {
            return "";
        }
        &text[quote_len..text.len() - quote_len]
    }

    /// The string value with escapes decoded. Raw strings are returned verbatim.
    pub fn value(&self) -> Cow<'_, str> {
        let contents = self.raw_contents();
        if self.is_raw() || !contents.contains('\\') {
            return Cow::Borrowed(contents);
        }
        Cow::Owned(unescape(contents))
    }
}

pub fn unescape(contents: &str) -> String {
    let mut ret = String::with_capacity(contents.len());
    let mut chars = contents.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }

        match chars.next() {
            Some('\\') => ret.push('\\'),
            Some('\'') => ret.push('\''),
            Some('"') => ret.push('"'),
            Some('n') => ret.push('\n'),
            Some('t') => ret.push('\t'),
            Some('r') => ret.push('\r'),
            // Escaped line break continues the string on the next line
            Some('\n') => {}
            Some(other) => {
                ret.push('\\');
                ret.push(other);
            }
            None => ret.push('\\'),
        }
    }

    ret
}

#[cfg(test)]
mod test {
    use super::{parse_int, unescape};

    #[test]
    fn escapes() {
        assert_eq!(unescape(r#"a\nb"#), "a\nb");
        assert_eq!(unescape(r#"\"quoted\""#), "\"quoted\"");
        assert_eq!(unescape(r#"keep\d"#), r#"keep\d"#);
        assert_eq!(unescape("line \\\ncontinued"), "line continued");
    }

    #[test]
    fn ints() {
        assert_eq!(parse_int("42", false), Some(42));
        assert_eq!(parse_int("42", true), Some(-42));
        assert_eq!(parse_int("9223372036854775808", true), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808", false), None);
        assert_eq!(parse_int("0x10", false), None);
    }
}
