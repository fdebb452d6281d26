use formula_syntax::address::column::{to_col, to_row};
use formula_syntax::{
    fix_ranges, translate_formula_to_a1, translate_formula_to_r1c1, FixOptions, TranslateOptions,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn translates_whole_formulas() {
    init_logger();
    let opts = TranslateOptions::default();
    assert_eq!(
        translate_formula_to_a1("=SUM(R[-3]C:R[-1]C)/R1C[-1]", "C4", &opts).unwrap(),
        "=SUM(C1:C3)/B$1"
    );
    assert_eq!(
        translate_formula_to_a1("='Q 1'!R2C2&Rates&\"R1C1\"", "A1", &opts).unwrap(),
        "='Q 1'!$B$2&Rates&\"R1C1\""
    );
}

#[test]
fn off_sheet_references_become_ref_errors() {
    init_logger();
    let opts = TranslateOptions {
        wrap_edges: false,
        ..TranslateOptions::default()
    };
    assert_eq!(
        translate_formula_to_a1("=SUM(R[-1]C:RC)+1", "A1", &opts).unwrap(),
        "=SUM(#REF!)+1"
    );
    assert_eq!(
        translate_formula_to_a1("=RC[16383]", "B1", &TranslateOptions::default()).unwrap(),
        "=A1"
    );
}

#[test]
fn options_deserialize_from_partial_json() {
    let opts: TranslateOptions = serde_json::from_str(r#"{"wrap_edges":false}"#).unwrap();
    assert!(!opts.wrap_edges);
    assert!(opts.merge_refs);
    assert!(opts.allow_ternary);

    let fix: FixOptions = serde_json::from_str(r#"{"add_bounds":true}"#).unwrap();
    assert_eq!(fix_ranges("=A3:A", &fix), "=A3:A1048576");
}

fn cell_text(row: u32, col: u32, row_abs: bool, col_abs: bool) -> String {
    format!(
        "{}{}{}{}",
        if col_abs { "$" } else { "" },
        to_col(col),
        if row_abs { "$" } else { "" },
        to_row(row)
    )
}

proptest! {
    #[test]
    fn a1_survives_a_trip_through_r1c1(
        row in 0u32..5000,
        col in 0u32..500,
        anchor_row in 0u32..5000,
        anchor_col in 0u32..500,
        row_abs in any::<bool>(),
        col_abs in any::<bool>(),
    ) {
        let opts = TranslateOptions::default();
        let anchor = cell_text(anchor_row, anchor_col, false, false);
        let formula = format!("={}+1", cell_text(row, col, row_abs, col_abs));
        let r1c1 = translate_formula_to_r1c1(&formula, &anchor, &opts);
        prop_assert!(r1c1.is_ok());
        let back = translate_formula_to_a1(&r1c1.unwrap_or_default(), &anchor, &opts);
        prop_assert_eq!(back.ok(), Some(formula));
    }
}
