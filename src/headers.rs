//! Header lookup over provider header lists

use crate::models::Header;

/// Value of the first header named exactly `name`, or `""`
///
/// Names are compared case-sensitively and list order decides between
/// duplicates. An absent list behaves like an empty one.
pub fn header_value<'a>(headers: Option<&'a [Header]>, name: &str) -> &'a str {
    headers
        .unwrap_or_default()
        .iter()
        .find(|h| h.name == name)
        .map_or("", |h| h.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::header_value;
    use crate::models::Header;

    #[test]
    fn returns_first_exact_match() {
        let headers = vec![
            Header::new("Subject", "first"),
            Header::new("From", "a@b.com"),
            Header::new("Subject", "second"),
        ];
        assert_eq!(header_value(Some(&headers), "Subject"), "first");
        assert_eq!(header_value(Some(&headers), "From"), "a@b.com");
    }

    #[test]
    fn does_not_fold_case() {
        let headers = vec![Header::new("subject", "lower")];
        assert_eq!(header_value(Some(&headers), "Subject"), "");
        assert_eq!(header_value(Some(&headers), "subject"), "lower");
    }

    #[test]
    fn absent_or_empty_list_yields_empty_string() {
        assert_eq!(header_value(None, "From"), "");
        assert_eq!(header_value(Some(&[]), "From"), "");
    }
}
