//! Tests for query-string overrides and the plus-for-space rewrite.

use get_dropbox_link::error::LinkError;
use get_dropbox_link::query::{apply_plus_for_space, QuerySpec};
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

mod parse {
    use super::*;

    #[test]
    fn empty_input_is_noop() {
        let spec = QuerySpec::parse("").unwrap();
        assert!(spec.is_empty());

        let link = url("https://www.dropbox.com/s/abc/file.txt?dl=0");
        assert_eq!(spec.merge(&link), link);
    }

    #[test]
    fn missing_equals_sign() {
        let err = QuerySpec::parse("dl").unwrap_err();
        assert!(matches!(err, LinkError::QueryParseError(_)));
    }

    #[test]
    fn dangling_ampersand() {
        assert!(QuerySpec::parse("dl=1&").is_err());
        assert!(QuerySpec::parse("&dl=1").is_err());
        assert!(QuerySpec::parse("a=1&&b=2").is_err());
    }

    #[test]
    fn double_equals_sign() {
        assert!(QuerySpec::parse("a=1=2").is_err());
    }

    #[test]
    fn empty_key() {
        assert!(QuerySpec::parse("=1").is_err());
    }

    #[test]
    fn invalid_percent_encoding() {
        assert!(QuerySpec::parse("a=%G1").is_err());
        assert!(QuerySpec::parse("a=100%").is_err());
    }

    #[test]
    fn blank_value_is_kept() {
        let spec = QuerySpec::parse("rlkey=").unwrap();
        assert_eq!(spec.get("rlkey"), Some(&[String::new()][..]));
    }
}

mod merge {
    use super::*;

    #[test]
    fn spec_wins_on_collision() {
        let spec = QuerySpec::parse("a=1").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?a=0&b=2"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?a=1&b=2");
    }

    #[test]
    fn blank_value_removes_key() {
        let spec = QuerySpec::parse("b=").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?a=0&b=2"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?a=0");
    }

    #[test]
    fn removing_every_key_drops_query() {
        let spec = QuerySpec::parse("dl=").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?dl=0"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc");
    }

    #[test]
    fn new_keys_are_appended() {
        let spec = QuerySpec::parse("raw=1").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?dl=0"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?dl=0&raw=1");
    }

    #[test]
    fn link_without_query() {
        let spec = QuerySpec::parse("dl=1").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?dl=1");
    }

    #[test]
    fn repeated_values_are_kept() {
        let spec = QuerySpec::parse("tag=x&tag=y").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?tag=old"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?tag=x&tag=y");
    }

    #[test]
    fn untouched_fields_keep_their_text() {
        let spec = QuerySpec::parse("dl=1").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?x=&y=a~b&dl=0"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?x=&y=a~b&dl=1");
    }

    #[test]
    fn untouched_encoded_space_is_not_rewritten() {
        let spec = QuerySpec::parse("raw=1").unwrap();
        let merged = spec.merge(&url("https://example.com/s/abc?name=a%20b"));
        assert_eq!(merged.as_str(), "https://example.com/s/abc?name=a%20b&raw=1");
    }

    #[test]
    fn input_url_is_untouched() {
        let link = url("https://example.com/s/abc?a=0");
        let _ = QuerySpec::parse("a=1").unwrap().merge(&link);
        assert_eq!(link.as_str(), "https://example.com/s/abc?a=0");
    }
}

mod plus_for_space {
    use super::*;

    #[test]
    fn replaces_encoded_spaces_in_stem() {
        let link = url("https://www.dropbox.com/s/abc/My%20File.txt?dl=0");
        assert_eq!(
            apply_plus_for_space(&link).as_str(),
            "https://www.dropbox.com/s/abc/My+File.txt?dl=0"
        );
    }

    #[test]
    fn query_is_not_altered() {
        let link = url("https://www.dropbox.com/s/abc/My%20File.txt?name=a%20b");
        assert_eq!(
            apply_plus_for_space(&link).as_str(),
            "https://www.dropbox.com/s/abc/My+File.txt?name=a%20b"
        );
    }

    #[test]
    fn earlier_segments_are_not_altered() {
        let link = url("https://www.dropbox.com/s/a%20b/My%20File.txt");
        assert_eq!(
            apply_plus_for_space(&link).as_str(),
            "https://www.dropbox.com/s/a%20b/My+File.txt"
        );
    }

    #[test]
    fn no_encoded_spaces_is_identity() {
        let link = url("https://www.dropbox.com/s/abc/report.pdf?dl=0");
        let once = apply_plus_for_space(&link);
        assert_eq!(once, link);
        assert_eq!(apply_plus_for_space(&once), once);
    }

    #[test]
    fn name_without_extension() {
        let link = url("https://www.dropbox.com/scl/fo/abc/My%20Folder");
        assert_eq!(
            apply_plus_for_space(&link).as_str(),
            "https://www.dropbox.com/scl/fo/abc/My+Folder"
        );
    }
}
