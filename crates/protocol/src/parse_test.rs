//! Tests for the TSV line parser

use crate::error::ParseError;
use crate::parse::{parse_app_ids, parse_line};

#[test]
fn test_parse_valid_line() {
    let record = parse_line("idfa\tABC123\t55.55\t37.37\t42,43,44").unwrap();

    assert_eq!(record.device_type, "idfa");
    assert_eq!(record.device_id, "ABC123");
    assert_eq!(record.latitude, 55.55);
    assert_eq!(record.longitude, 37.37);
    assert_eq!(record.app_ids, vec![42, 43, 44]);
    assert_eq!(record.key(), "idfa:ABC123");
}

#[test]
fn test_parse_bad_latitude() {
    let err = parse_line("idfa\tABC123\tbad\t37.37\t42").unwrap_err();
    assert!(matches!(err, ParseError::Latitude { ref value, .. } if value == "bad"));
    assert_eq!(err.kind(), "latitude");
}

#[test]
fn test_parse_bad_longitude() {
    let err = parse_line("gaid\tXYZ\t55.55\t\t42").unwrap_err();
    assert!(matches!(err, ParseError::Longitude { ref value, .. } if value.is_empty()));
    assert_eq!(err.kind(), "longitude");
}

#[test]
fn test_parse_skips_bad_app_ids() {
    let record = parse_line("idfa\tABC123\t55.55\t37.37\t42,xx,44").unwrap();
    assert_eq!(record.app_ids, vec![42, 44]);
}

#[test]
fn test_parse_all_app_ids_invalid_is_still_valid() {
    let record = parse_line("adid\tD1\t1.0\t2.0\tfoo,bar,").unwrap();
    assert!(record.app_ids.is_empty());
}

#[test]
fn test_parse_empty_app_field() {
    let record = parse_line("dvid\tD1\t1.0\t2.0\t").unwrap();
    assert!(record.app_ids.is_empty());
}

#[test]
fn test_parse_too_few_fields() {
    let err = parse_line("idfa\tABC123\t55.55\t37.37").unwrap_err();
    assert_eq!(
        err,
        ParseError::FieldCount {
            expected: 5,
            actual: 4
        }
    );
}

#[test]
fn test_parse_too_many_fields() {
    let err = parse_line("idfa\tABC123\t55.55\t37.37\t42\textra").unwrap_err();
    assert!(matches!(err, ParseError::FieldCount { actual: 6, .. }));
    assert_eq!(err.kind(), "field_count");
}

#[test]
fn test_parse_spaces_are_not_separators() {
    let err = parse_line("idfa ABC123 55.55 37.37 42").unwrap_err();
    assert!(matches!(err, ParseError::FieldCount { actual: 1, .. }));
}

#[test]
fn test_parse_negative_coordinates() {
    let record = parse_line("gaid\tG\t-33.86\t-151.2\t1").unwrap();
    assert_eq!(record.latitude, -33.86);
    assert_eq!(record.longitude, -151.2);
}

#[test]
fn test_parse_app_ids_keeps_order_and_duplicates() {
    assert_eq!(parse_app_ids("7,3,7,1"), vec![7, 3, 7, 1]);
}

#[test]
fn test_parse_app_ids_rejects_out_of_range() {
    // u32::MAX + 1 and negative values are dropped
    assert_eq!(parse_app_ids("4294967295,4294967296,-1,5"), vec![u32::MAX, 5]);
}

#[test]
fn test_parse_app_ids_does_not_trim() {
    assert_eq!(parse_app_ids("1, 2,3 "), vec![1]);
}
