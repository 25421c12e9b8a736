use testrail_reporter::cases::{CaseIdError, CaseMap, parse_case_id, parse_case_ids};
use testrail_reporter::model::TestItem;

#[test]
fn parse_case_id_takes_trailing_digits() {
    assert_eq!(parse_case_id("C123"), Ok(123));
    assert_eq!(parse_case_id("42"), Ok(42));
    assert_eq!(parse_case_id("suite-7-case-0019"), Ok(19));
}

#[test]
fn parse_case_id_rejects_missing_trailing_digits() {
    for raw in ["", "C", "12abc", "C12 "] {
        assert_eq!(
            parse_case_id(raw),
            Err(CaseIdError::MissingDigits(raw.to_string())),
            "{raw:?}"
        );
    }
}

#[test]
fn parse_case_id_rejects_overflow() {
    let err = parse_case_id("C99999999999999999999999").expect_err("expected overflow");
    assert!(matches!(err, CaseIdError::OutOfRange(_)));
}

#[test]
fn parse_case_ids_fails_on_first_malformed_id() {
    assert_eq!(parse_case_ids(&["C1", "C20"]), Ok(vec![1, 20]));
    assert!(parse_case_ids(&["C1", "nope"]).is_err());
}

#[test]
fn case_map_unions_ids_across_tests() {
    let items = vec![
        TestItem::new("a", &["C3", "C1"]),
        TestItem::new("b", &["C1", "C2"]),
        TestItem::new("c", &[]),
    ];

    let map = CaseMap::from_items(&items).expect("case map");
    assert_eq!(map.case_ids("a"), &[3, 1]);
    assert!(map.case_ids("c").is_empty());
    assert!(map.case_ids("missing").is_empty());
    assert_eq!(map.all_case_ids(), vec![1, 2, 3]);
}

#[test]
fn case_map_propagates_parse_errors() {
    let items = vec![TestItem::new("a", &["C1", "bogus"])];
    assert!(CaseMap::from_items(&items).is_err());
}
