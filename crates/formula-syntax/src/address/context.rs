//! Sheet and workbook prefixes: quoting, unquoting, splitting and rendering.

use super::RefContext;

/// Returns `true` if `name` must be wrapped in single quotes to be used as a sheet prefix.
pub fn needs_quotes(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() {
        return true;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || (!c.is_ascii() && c.is_alphanumeric()))
    {
        return true;
    }
    // Names that would lex as a reference or boolean need quotes to stay a prefix.
    name.eq_ignore_ascii_case("TRUE")
        || name.eq_ignore_ascii_case("FALSE")
        || looks_like_a1_cell(name)
        || looks_like_r1c1(name)
}

fn looks_like_a1_cell(name: &str) -> bool {
    let letters = name.bytes().take_while(u8::is_ascii_alphabetic).count();
    if letters == 0 || letters > 3 || letters == name.len() {
        return false;
    }
    name.as_bytes()[letters..].iter().all(u8::is_ascii_digit)
}

fn looks_like_r1c1(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut seen = false;
    for axis in ['R', 'C'] {
        if let Some(after) = rest.strip_prefix(axis) {
            seen = true;
            rest = after.trim_start_matches(|c: char| c.is_ascii_digit());
        }
    }
    seen && rest.is_empty()
}

/// Wrap `name` in single quotes (doubling embedded quotes) if it needs it.
pub fn quote_name(name: &str) -> String {
    if needs_quotes(name) {
        quote_always(name)
    } else {
        name.to_string()
    }
}

fn quote_always(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Strip surrounding single quotes and un-double embedded ones. Unquoted input is returned as is.
pub fn unquote(raw: &str) -> String {
    match raw
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

/// Split raw context text (the part before `!`, quoted or not) into a [`RefContext`].
///
/// `[Book.xlsx]Sheet1` yields a workbook and a sheet. Outside xlsx mode a bracketed workbook
/// without a sheet is rejected.
pub fn split_context(raw: &str, xlsx: bool) -> Option<RefContext> {
    let text = unquote(raw);
    let (workbook, sheet) = match text.strip_prefix('[') {
        Some(after) => {
            let close = after.find(']')?;
            let workbook = &after[..close];
            if workbook.is_empty() {
                return None;
            }
            (Some(workbook.to_string()), &after[close + 1..])
        }
        None => (None, text.as_str()),
    };
    let sheet = (!sheet.is_empty()).then(|| sheet.to_string());

    if xlsx {
        if workbook.is_none() && sheet.is_none() {
            return None;
        }
        return Some(RefContext::Xlsx {
            workbook_name: workbook,
            sheet_name: sheet,
        });
    }

    let sheet = sheet?;
    Some(RefContext::Chain(workbook.into_iter().chain([sheet]).collect()))
}

/// Render a context as prefix text, without the trailing `!`. Empty contexts render as `""`.
pub fn stringify_context(context: &RefContext) -> String {
    match context {
        RefContext::Chain(parts) => match parts.as_slice() {
            [] => String::new(),
            [sheet] => quote_name(sheet),
            [workbook, sheet, ..] => prefix_text(Some(workbook), Some(sheet)),
        },
        RefContext::Xlsx {
            workbook_name,
            sheet_name,
        } => prefix_text(workbook_name.as_deref(), sheet_name.as_deref()),
    }
}

fn prefix_text(workbook: Option<&str>, sheet: Option<&str>) -> String {
    match (workbook, sheet) {
        (Some(workbook), Some(sheet)) => {
            let joined = format!("[{workbook}]{sheet}");
            if needs_quotes(sheet) || workbook_needs_quotes(workbook) {
                quote_always(&joined)
            } else {
                joined
            }
        }
        (Some(workbook), None) => format!("[{workbook}]"),
        (None, Some(sheet)) => quote_name(sheet),
        (None, None) => String::new(),
    }
}

fn workbook_needs_quotes(workbook: &str) -> bool {
    workbook
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '\'' | '!' | '(' | ')' | ',' | ';' | '-' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_rules() {
        assert_eq!(quote_name("Sheet1"), "Sheet1");
        assert_eq!(quote_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_name("O'Brien"), "'O''Brien'");
        assert_eq!(quote_name("A1"), "'A1'");
        assert_eq!(quote_name("R1C1"), "'R1C1'");
        assert_eq!(quote_name("true"), "'true'");
        assert_eq!(quote_name("2019"), "'2019'");
        assert_eq!(unquote("'O''Brien'"), "O'Brien");
        assert_eq!(unquote("Plain"), "Plain");
    }

    #[test]
    fn splitting_contexts() {
        assert_eq!(
            split_context("[Book.xlsx]Sheet1", false),
            Some(RefContext::Chain(vec!["Book.xlsx".into(), "Sheet1".into()]))
        );
        assert_eq!(
            split_context("'[Book 1.xlsx]My Sheet'", false),
            Some(RefContext::Chain(vec!["Book 1.xlsx".into(), "My Sheet".into()]))
        );
        assert_eq!(split_context("[Book.xlsx]", false), None);
        assert_eq!(
            split_context("[1]", true),
            Some(RefContext::Xlsx {
                workbook_name: Some("1".into()),
                sheet_name: None
            })
        );
    }

    #[test]
    fn rendering_contexts() {
        let chain = RefContext::Chain(vec!["Book 1.xlsx".into(), "Sheet1".into()]);
        assert_eq!(stringify_context(&chain), "'[Book 1.xlsx]Sheet1'");
        let xlsx = RefContext::Xlsx {
            workbook_name: Some("1".into()),
            sheet_name: None,
        };
        assert_eq!(stringify_context(&xlsx), "[1]");
        assert_eq!(stringify_context(&RefContext::default()), "");
    }
}
