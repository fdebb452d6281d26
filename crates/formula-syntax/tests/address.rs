use formula_syntax::address::column::{from_col, to_col};
use formula_syntax::address::structured::StructuredRef;
use formula_syntax::{
    from_a1, from_r1c1, to_a1, to_r1c1, A1Range, AddressError, R1C1Range, RefContext, RefTarget,
    Reference, MAX_COL_INDEX, MAX_ROW_INDEX,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn column_letters() {
    assert_eq!(to_col(0), "A");
    assert_eq!(to_col(25), "Z");
    assert_eq!(to_col(26), "AA");
    assert_eq!(to_col(MAX_COL_INDEX), "XFD");
    assert_eq!(from_col("xfd"), Some(MAX_COL_INDEX));
}

#[test]
fn reference_from_str() {
    let reference: Reference = "'My Sheet'!$A$1:B2".parse().unwrap();
    assert_eq!(reference.context, RefContext::Chain(vec!["My Sheet".to_string()]));
    let range = reference.range().unwrap();
    assert_eq!((range.top, range.left, range.bottom, range.right), (Some(0), Some(0), Some(1), Some(1)));
    assert!(range.top_abs && range.left_abs && !range.bottom_abs);

    let named = Reference::from_a1_str("[Book1.xlsx]Sheet1!Rates").unwrap();
    assert_eq!(named.name(), Some("Rates"));
    assert_eq!(
        named.context,
        RefContext::Chain(vec!["Book1.xlsx".to_string(), "Sheet1".to_string()])
    );

    let table = Reference::from_a1_str("Sales[[#Totals],[Q1]]").unwrap();
    assert_eq!(
        table.target,
        RefTarget::Table(StructuredRef {
            table: Some("Sales".to_string()),
            columns: vec!["Q1".to_string()],
            sections: vec!["totals".to_string()],
        })
    );

    assert_eq!(
        Reference::from_a1_str("1+1"),
        Err(AddressError::Invalid {
            input: "1+1".to_string()
        })
    );
}

#[test]
fn range_json_uses_dollar_flags() {
    let range = from_a1("$B2", false).unwrap();
    let json = serde_json::to_value(range).unwrap();
    assert_eq!(json["$left"], serde_json::json!(true));
    assert_eq!(json["$top"], serde_json::json!(false));
    let back: A1Range = serde_json::from_value(json).unwrap();
    assert_eq!(back, range);
}

fn a1_cell() -> impl Strategy<Value = A1Range> {
    (0..=MAX_ROW_INDEX, 0..=MAX_COL_INDEX, any::<bool>(), any::<bool>()).prop_map(
        |(row, col, row_abs, col_abs)| A1Range {
            top_abs: row_abs,
            bottom_abs: row_abs,
            left_abs: col_abs,
            right_abs: col_abs,
            ..A1Range::cell(row, col)
        },
    )
}

fn a1_rect() -> impl Strategy<Value = A1Range> {
    (
        0..=MAX_ROW_INDEX,
        0..=MAX_COL_INDEX,
        0..=MAX_ROW_INDEX,
        0..=MAX_COL_INDEX,
        any::<[bool; 4]>(),
    )
        .prop_map(|(top, left, bottom, right, abs)| A1Range {
            top_abs: abs[0],
            left_abs: abs[1],
            bottom_abs: abs[2],
            right_abs: abs[3],
            ..A1Range::rect(top, left, bottom, right)
        })
}

fn r1c1_rect() -> impl Strategy<Value = R1C1Range> {
    let axis = |max: u32| {
        prop_oneof![
            (0..=max as i32).prop_map(|v| (v, true)),
            (-(max as i32)..=max as i32).prop_map(|v| (v, false)),
        ]
    };
    (
        axis(MAX_ROW_INDEX),
        axis(MAX_COL_INDEX),
        axis(MAX_ROW_INDEX),
        axis(MAX_COL_INDEX),
    )
        .prop_map(|((r0, r0_abs), (c0, c0_abs), (r1, r1_abs), (c1, c1_abs))| R1C1Range {
            r0: Some(r0),
            c0: Some(c0),
            r1: Some(r1),
            c1: Some(c1),
            r0_abs,
            c0_abs,
            r1_abs,
            c1_abs,
            trim: None,
        })
}

proptest! {
    #[test]
    fn column_letters_are_a_bijection(col in 0..=MAX_COL_INDEX) {
        let letters = to_col(col);
        prop_assert!(letters.len() <= 3);
        prop_assert_eq!(from_col(&letters), Some(col));
    }

    #[test]
    fn cells_round_trip(cell in a1_cell()) {
        prop_assert_eq!(from_a1(&to_a1(&cell), false), Some(cell));
    }

    #[test]
    fn a1_text_is_canonical(range in a1_rect()) {
        let text = to_a1(&range.normalized());
        let reparsed = from_a1(&text, false);
        prop_assert!(reparsed.is_some(), "{} did not parse", text);
        prop_assert_eq!(to_a1(&reparsed.unwrap_or_default()), text);
    }

    #[test]
    fn r1c1_text_reaches_a_fixed_point(range in r1c1_rect()) {
        let reparse = |text: &str| from_r1c1(text, false).map(|r| to_r1c1(&r));
        let once = reparse(&to_r1c1(&range));
        prop_assert!(once.is_some());
        let once = once.unwrap_or_default();
        prop_assert_eq!(reparse(&once), Some(once.clone()));
    }
}

#[test]
fn sheet_bounds() {
    assert_eq!(to_a1(&A1Range::cell(MAX_ROW_INDEX, MAX_COL_INDEX)), "XFD1048576");
    assert!(from_a1("XFE1", false).is_none());
    assert!(from_a1("A1048577", false).is_none());
}
