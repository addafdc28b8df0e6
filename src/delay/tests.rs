use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

#[rstest]
#[case("250ms", 250)]
#[case(" 10ms ", 10)]
#[case("1.5s", 1500)]
#[case("2m", 120_000)]
#[case("0", 0)]
#[case("42", 42)]
fn parse_literal(#[case] input: &str, #[case] ms: u64) {
    assert_eq!(input.parse::<Delay>(), Ok(Delay::from_millis(ms)));
}

#[rstest]
#[case("")]
#[case("ms")]
#[case("abc")]
#[case("-5ms")]
#[case("NaNms")]
#[case("infs")]
fn parse_rejects_invalid(#[case] input: &str) {
    assert!(input.parse::<Delay>().is_err());
}

#[test]
fn default_applies_only_to_unspecified() {
    let default = Duration::from_millis(250);
    assert_eq!(None::<u64>.into_delay_or(default), default);
    assert_eq!(Some(10u64).into_delay_or(default), Duration::from_millis(10));
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
#[case(-1.0)]
fn invalid_numbers_coerce_to_zero(#[case] input: f64) {
    assert_eq!(input.into_delay_or(DEFAULT_DEBOUNCE_WAIT), Duration::ZERO);
}

#[test]
fn invalid_literal_coerces_to_zero() {
    assert_eq!("soon".into_delay(), Duration::ZERO);
    assert_eq!((-3i64).into_delay(), Duration::ZERO);
}

#[test]
fn display_is_milliseconds() {
    assert_eq!(Delay::from_millis(250).to_string(), "250ms");
    assert_eq!(Delay::new(Duration::from_micros(1500)).to_string(), "1.5ms");
}

#[test]
fn deserialize_number_or_literal() {
    let d: Vec<Delay> = serde_json::from_str(r#"[100, "2s", 0.5]"#).unwrap();
    assert_eq!(
        d,
        [
            Delay::from_millis(100),
            Delay::from_millis(2000),
            Delay::new(Duration::from_micros(500))
        ]
    );
}

#[test]
fn deserialize_rejects_negative() {
    assert!(serde_json::from_str::<Delay>("-1").is_err());
    assert!(serde_json::from_str::<Delay>(r#""-1s""#).is_err());
}

#[test]
fn serialize_round_trips_through_literal() {
    let json = serde_json::to_string(&Delay::from_millis(75)).unwrap();
    assert_eq!(json, r#""75ms""#);
}
