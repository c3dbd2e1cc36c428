//! Value conversion tables: `threshold=replacement|threshold=replacement`

use url::form_urlencoded;

use crate::error::{ConvertError, Result};

/// Threshold lookup table parsed from a command argument
///
/// Thresholds are compared as strings, so `"10"` sorts before `"2"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionTable {
    /// Sorted ascending by (threshold, replacement)
    pairs: Vec<(String, String)>,
}

impl ConversionTable {
    /// Parse `k=v|k=v`; operands are form-URL-decoded (`+` is a space)
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.is_empty() {
            return Ok(Self::default());
        }

        let mut pairs = spec
            .split('|')
            .map(|part| {
                let (threshold, replacement) = part
                    .split_once('=')
                    .ok_or_else(|| ConvertError::MalformedConversion(part.to_string()))?;
                Ok((unquote_plus(threshold), unquote_plus(replacement)))
            })
            .collect::<Result<Vec<_>>>()?;
        pairs.sort();

        Ok(Self { pairs })
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Replacement of the greatest threshold not above `value`, or `value`
    /// itself when every threshold is above it
    pub fn apply(&self, value: &str) -> String {
        self.pairs
            .iter()
            .rev()
            .find(|(threshold, _)| value >= threshold.as_str())
            .map(|(_, replacement)| replacement.clone())
            .unwrap_or_else(|| value.to_string())
    }
}

fn unquote_plus(operand: &str) -> String {
    // form_urlencoded splits on '&' and '='; keep both literal
    let escaped = operand.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", "")]
    #[case("0", "cut")]
    #[case("-1", "-1")]
    #[case("5", "")]
    fn test_cut_table(#[case] key: &str, #[case] expected: &str) {
        let table = ConversionTable::parse("0=cut|1=").unwrap();
        assert_eq!(table.apply(key), expected);
    }

    #[test]
    fn test_operands_are_decoded() {
        let table = ConversionTable::parse("a=Hello+World|b=50%25").unwrap();
        assert_eq!(table.apply("a"), "Hello World");
        assert_eq!(table.apply("bz"), "50%");
    }

    #[test]
    fn test_string_ordering_of_thresholds() {
        let table = ConversionTable::parse("2=two|10=ten").unwrap();
        // "9" >= "2" but "9" >= "10" too, and "2" sorts last
        assert_eq!(table.apply("9"), "two");
        assert_eq!(table.apply("15"), "ten");
    }

    #[test]
    fn test_malformed_entry() {
        assert!(matches!(
            ConversionTable::parse("0=cut|oops"),
            Err(ConvertError::MalformedConversion(part)) if part == "oops"
        ));
    }

    #[test]
    fn test_empty_table_passes_through() {
        let table = ConversionTable::parse("").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.apply("anything"), "anything");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_result_is_value_or_a_replacement(
            entries in prop::collection::vec(("[a-z0-9]{1,3}", "[A-Z]{0,3}"), 1..6),
            value in "[a-z0-9]{0,4}",
        ) {
            let spec: Vec<String> = entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            let table = ConversionTable::parse(&spec.join("|")).unwrap();
            let result = table.apply(&value);

            let below_all = entries.iter().all(|(k, _)| value.as_str() < k.as_str());
            if below_all {
                prop_assert_eq!(result, value);
            } else {
                prop_assert!(entries.iter().any(|(_, v)| *v == result));
            }
        }
    }
}
