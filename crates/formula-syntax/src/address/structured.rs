//! Structured (table) references: `Table1[Col]`, `Table1[[#Headers],[A]:[C]]`, `[@Qty]`.

use serde::{Deserialize, Serialize};

use super::{split_reference_tokens, RefOptions, RefTarget, Reference};
use crate::lexer::{tokenize, TokenizeOptions};
use crate::token::TokenKind;
use crate::AddressError;

/// Table section keywords, lowercase, in canonical order.
pub const SECTIONS: [&str; 5] = ["all", "data", "headers", "totals", "this row"];

/// A parsed table reference.
///
/// `table` is `None` for the in-table shorthand (`[@Qty]`). `columns` holds one column or the two
/// ends of a column span; `sections` holds lowercase section keywords.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StructuredRef {
    pub table: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sections: Vec<String>,
}

fn is_table_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '\\'
}

fn is_table_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\\' | '.' | '?')
}

/// Find the end of a structured reference starting at byte `pos`: an optional table name followed
/// by one bracket group, with nested brackets balanced and `'` escapes honoured.
pub(crate) fn scan_structured(text: &str, pos: usize) -> Option<usize> {
    let rest = &text[pos..];
    let mut chars = rest.char_indices().peekable();

    if let Some(&(_, first)) = chars.peek() {
        if is_table_name_start(first) {
            while chars.next_if(|&(_, c)| is_table_name_char(c)).is_some() {}
        }
    }
    if chars.next_if(|&(_, c)| c == '[').is_none() {
        return None;
    }

    let mut depth = 1;
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => {
                chars.next()?;
            }
            '[' => {
                depth += 1;
                if depth > 2 {
                    return None;
                }
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn section_keyword(text: &str) -> Option<&'static str> {
    let keyword = text.trim().strip_prefix('#')?;
    SECTIONS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(keyword))
}

fn unescape_column(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// An unescaped leading `#` is a keyword, so a column never starts with one.
fn column_name(text: &str) -> Option<String> {
    (!text.trim_start().starts_with('#')).then(|| unescape_column(text))
}

fn escape_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '[' | ']' | '#' | '\'') {
            out.push('\'');
        }
        out.push(c);
    }
    out
}

/// Split the inside of a bracket group into top-level `[..]` items and the separators between
/// them. Returns `None` when anything other than whitespace, `,` or `:` sits between items.
fn split_items(inner: &str) -> Option<Vec<(char, &str)>> {
    let mut items = Vec::new();
    let mut separator = ',';
    let mut chars = inner.char_indices().peekable();
    let mut expect_item = true;

    while let Some((i, c)) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '[' if expect_item => {
                let start = i + 1;
                let mut end = None;
                while let Some((j, c)) = chars.next() {
                    match c {
                        '\'' => {
                            chars.next()?;
                        }
                        ']' => {
                            end = Some(j);
                            break;
                        }
                        '[' => return None,
                        _ => {}
                    }
                }
                items.push((separator, &inner[start..end?]));
                expect_item = false;
            }
            ',' | ':' if !expect_item => {
                separator = c;
                expect_item = true;
            }
            _ => return None,
        }
    }
    if expect_item && !items.is_empty() {
        return None;
    }
    Some(items)
}

fn valid_sections(sections: &[String]) -> bool {
    let mut sorted: Vec<&str> = sections.iter().map(String::as_str).collect();
    sorted.sort_by_key(|s| SECTIONS.iter().position(|k| k == s));
    let before = sorted.len();
    sorted.dedup();
    if sorted.len() != before {
        return false;
    }
    matches!(
        sorted.as_slice(),
        [] | [_] | ["data", "headers"] | ["data", "totals"]
    )
}

/// Parse the text of a structured reference without a sheet prefix.
///
/// ```
/// use formula_syntax::address::structured::parse_table;
///
/// let table = parse_table("Sales[[#Headers],[Q1]:[Q4]]").unwrap();
/// assert_eq!(table.table.as_deref(), Some("Sales"));
/// assert_eq!(table.columns, ["Q1", "Q4"]);
/// assert_eq!(table.sections, ["headers"]);
/// ```
pub fn parse_table(text: &str) -> Option<StructuredRef> {
    if scan_structured(text, 0)? != text.len() {
        return None;
    }
    let open = text.find('[')?;
    let table = (open > 0).then(|| text[..open].to_string());
    let inner = &text[open + 1..text.len() - 1];

    let mut columns = Vec::new();
    let mut sections = Vec::new();

    if let Some(after_at) = inner.trim_start().strip_prefix('@') {
        sections.push("this row".to_string());
        let after_at = after_at.trim();
        if after_at.starts_with('[') {
            let items = split_items(after_at)?;
            if items.is_empty() || items.iter().skip(1).any(|(sep, _)| *sep != ':') {
                return None;
            }
            for (_, item) in items {
                if section_keyword(item).is_some() {
                    return None;
                }
                columns.push(column_name(item)?);
            }
        } else if !after_at.is_empty() {
            if after_at.contains(['[', ']', ',', ':']) {
                return None;
            }
            columns.push(column_name(after_at)?);
        }
    } else if inner.trim_start().starts_with('[') {
        let items = split_items(inner)?;
        let mut seen_range = false;
        for (index, (sep, item)) in items.into_iter().enumerate() {
            if let Some(section) = section_keyword(item) {
                if !columns.is_empty() {
                    return None;
                }
                sections.push(section.to_string());
                continue;
            }
            if sep == ':' {
                if columns.len() != 1 || seen_range || index == 0 {
                    return None;
                }
                seen_range = true;
            } else if !columns.is_empty() {
                return None;
            }
            columns.push(column_name(item)?);
        }
    } else if let Some(section) = section_keyword(inner) {
        sections.push(section.to_string());
    } else if !inner.trim().is_empty() {
        if inner.contains(['[', ']', ',', ':']) && !inner.contains('\'') {
            return None;
        }
        columns.push(column_name(inner)?);
    }

    if !valid_sections(&sections) {
        return None;
    }
    Some(StructuredRef {
        table,
        columns,
        sections,
    })
}

fn section_text(section: &str) -> String {
    match section {
        "this row" => "#This Row".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => format!("#{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => "#".to_string(),
            }
        }
    }
}

fn needs_brackets(column: &str) -> bool {
    !column
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Render a table reference in its shortest form.
pub fn stringify_table(table: &StructuredRef) -> String {
    let mut out = table.table.clone().unwrap_or_default();
    let columns = &table.columns;
    let sections = &table.sections;

    match (sections.as_slice(), columns.as_slice()) {
        ([section], []) => {
            out.push('[');
            out.push_str(&section_text(section));
            out.push(']');
        }
        ([], [column]) => {
            out.push('[');
            out.push_str(&escape_column(column));
            out.push(']');
        }
        _ => {
            out.push('[');
            let this_row = matches!(sections.as_slice(), [s] if s == "this row");
            if this_row {
                out.push('@');
            } else if !sections.is_empty() {
                let parts: Vec<String> = sections
                    .iter()
                    .map(|s| format!("[{}]", section_text(s)))
                    .collect();
                out.push_str(&parts.join(","));
                if !columns.is_empty() {
                    out.push(',');
                }
            }
            match columns.as_slice() {
                [column] if this_row && !needs_brackets(column) => {
                    out.push_str(&escape_column(column));
                }
                [] => {}
                _ => {
                    let parts: Vec<String> = columns
                        .iter()
                        .map(|c| format!("[{}]", escape_column(c)))
                        .collect();
                    out.push_str(&parts.join(":"));
                }
            }
            out.push(']');
        }
    }
    out
}

/// Parse a possibly prefixed structured reference such as `Sheet1!Sales[Q1]`.
pub fn parse_struct_ref(text: &str, opts: &RefOptions) -> Option<Reference> {
    let tokens = tokenize(
        text,
        &TokenizeOptions {
            merge_refs: false,
            negative_numbers: false,
            xlsx: opts.xlsx,
            ..TokenizeOptions::default()
        },
    );
    let (context, token) = split_reference_tokens(&tokens, opts.xlsx)?;
    if token.kind != TokenKind::Structured {
        return None;
    }
    Some(Reference {
        context,
        target: RefTarget::Table(parse_table(&token.value)?),
    })
}

/// [`parse_struct_ref`] for callers that want an error value.
pub fn parse_struct_ref_checked(text: &str, opts: &RefOptions) -> Result<Reference, AddressError> {
    parse_struct_ref(text, opts).ok_or_else(|| AddressError::Invalid {
        input: text.to_string(),
    })
}

/// Render a table reference with its context.
pub fn stringify_struct_ref(reference: &Reference) -> String {
    super::a1::stringify_a1_ref(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::RefContext;
    use pretty_assertions::assert_eq;

    fn table(name: Option<&str>, columns: &[&str], sections: &[&str]) -> StructuredRef {
        StructuredRef {
            table: name.map(str::to_string),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            sections: sections.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn scans_balanced_brackets() {
        assert_eq!(scan_structured("T[a]+1", 0), Some(4));
        assert_eq!(scan_structured("T[[#Data],[a]]", 0), Some(14));
        assert_eq!(scan_structured("T[a']']", 0), Some(7));
        assert_eq!(scan_structured("T[a", 0), None);
        assert_eq!(scan_structured("T", 0), None);
        assert_eq!(scan_structured("[[[x]]]", 0), None);
    }

    #[test]
    fn parses_simple_forms() {
        assert_eq!(parse_table("Sales[Q1]"), Some(table(Some("Sales"), &["Q1"], &[])));
        assert_eq!(parse_table("Sales[]"), Some(table(Some("Sales"), &[], &[])));
        assert_eq!(
            parse_table("Sales[#totals]"),
            Some(table(Some("Sales"), &[], &["totals"]))
        );
        assert_eq!(parse_table("[@Qty]"), Some(table(None, &["Qty"], &["this row"])));
        assert_eq!(
            parse_table("T[@[Unit Price]]"),
            Some(table(Some("T"), &["Unit Price"], &["this row"]))
        );
        assert_eq!(
            parse_table("T[Col '# 1]"),
            Some(table(Some("T"), &["Col # 1"], &[]))
        );
    }

    #[test]
    fn parses_compound_forms() {
        assert_eq!(
            parse_table("T[[#Headers],[#Data],[A]:[C]]"),
            Some(table(Some("T"), &["A", "C"], &["headers", "data"]))
        );
        assert_eq!(
            parse_table("T[ [#This Row] , [A] ]"),
            Some(table(Some("T"), &["A"], &["this row"]))
        );
        assert_eq!(parse_table("T[[#Headers],[#Totals]]"), None);
        assert_eq!(parse_table("T[[#All],[#All]]"), None);
        assert_eq!(parse_table("T[[A]:[B]:[C]]"), None);
        assert_eq!(parse_table("T[[#This  Row]]"), None);
        assert_eq!(parse_table("T[#Everything]"), None);
        assert_eq!(parse_table("T[[#Data],[#Col]]"), None);
        assert_eq!(parse_table("T[[A],[B]]"), None);
        assert_eq!(parse_table("T[[A],]"), None);
    }

    #[test]
    fn stringifies_shortest_form() {
        let cases = [
            "Sales[Q1]",
            "Sales[#Totals]",
            "Sales[]",
            "[@Qty]",
            "T[@[Unit Price]]",
            "T[[#Headers],[#Data],[A]:[C]]",
            "T[[A]:[C]]",
            "T[[#Data],[A]]",
            "T[Col '# 1]",
        ];
        for case in cases {
            let parsed = parse_table(case).unwrap();
            assert_eq!(stringify_table(&parsed), case);
        }
        assert_eq!(
            stringify_table(&parse_table("T[[#This Row],[A]]").unwrap()),
            "T[@A]"
        );
    }

    #[test]
    fn prefixed_structured_refs() {
        let parsed = parse_struct_ref("'Q 1'!Sales[[#Data],[Amt]]", &RefOptions::default()).unwrap();
        assert_eq!(parsed.context, RefContext::Chain(vec!["Q 1".into()]));
        assert_eq!(
            parsed.target,
            RefTarget::Table(table(Some("Sales"), &["Amt"], &["data"]))
        );
        assert_eq!(stringify_struct_ref(&parsed), "'Q 1'!Sales[[#Data],[Amt]]");
        assert!(parse_struct_ref("A1", &RefOptions::default()).is_none());
        assert!(parse_struct_ref_checked("Sales[", &RefOptions::default()).is_err());
    }
}
