//! Post-processing of share links: query-string overrides and `+` for spaces.

use url::form_urlencoded;
use url::Url;

use crate::error::{LinkError, Result};

/// Query parameters to overlay onto every link, in first-seen key order.
///
/// A key whose only values are empty strings is removed from the link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    entries: Vec<(String, Vec<String>)>,
}

impl QuerySpec {
    /// Strictly parse a raw query string such as `dl=1&rlkey=`.
    ///
    /// A leading `?` is ignored and empty input gives an empty spec. Every field
    /// must be `key=value` with a non-empty key and a single `=`, and every `%`
    /// must start a two-digit hex escape.
    ///
    /// # Examples
    ///
    /// ```
    /// use get_dropbox_link::query::QuerySpec;
    ///
    /// let spec = QuerySpec::parse("dl=1&raw=").unwrap();
    /// assert_eq!(spec.get("dl"), Some(&["1".to_string()][..]));
    /// assert!(QuerySpec::parse("dl").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut spec = QuerySpec::default();

        if raw.is_empty() {
            return Ok(spec);
        }

        for field in raw.split('&') {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                LinkError::QueryParseError(format!("field {:?} is missing '='", field))
            })?;
            if key.is_empty() {
                return Err(LinkError::QueryParseError(format!(
                    "field {:?} has an empty key",
                    field
                )));
            }
            if value.contains('=') {
                return Err(LinkError::QueryParseError(format!(
                    "field {:?} has more than one '='",
                    field
                )));
            }
            check_percent_escapes(field)?;

            spec.push(decode_component(key), decode_component(value));
        }

        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values given for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    fn push(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Return a copy of `url` with this spec overlaid on its query.
    ///
    /// Keys in the spec replace the link's values for that key, at the position of
    /// its first occurrence; new keys are appended. Spec values that are empty are
    /// dropped, so a blanked key disappears. Fields the spec does not name are kept
    /// byte for byte.
    pub fn merge(&self, url: &Url) -> Url {
        if self.is_empty() {
            return url.clone();
        }

        let mut fields: Vec<String> = Vec::new();
        let mut placed: Vec<&str> = Vec::new();

        for raw in url.query().unwrap_or_default().split('&') {
            if raw.is_empty() {
                continue;
            }
            let raw_key = raw.split_once('=').map_or(raw, |(k, _)| k);
            let key = decode_component(raw_key);

            match self.entries.iter().find(|(k, _)| *k == key) {
                Some((k, values)) => {
                    if !placed.contains(&k.as_str()) {
                        placed.push(k.as_str());
                        fields.extend(encode_values(k, values));
                    }
                }
                None => fields.push(raw.to_string()),
            }
        }

        for (key, values) in &self.entries {
            if !placed.contains(&key.as_str()) {
                fields.extend(encode_values(key, values));
            }
        }

        let mut result = url.clone();
        if fields.is_empty() {
            result.set_query(None);
        } else {
            result.set_query(Some(&fields.join("&")));
        }
        result
    }
}

fn encode_values<'a>(key: &'a str, values: &'a [String]) -> impl Iterator<Item = String> + 'a {
    values.iter().filter(|v| !v.is_empty()).map(move |value| {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish()
    })
}

fn check_percent_escapes(field: &str) -> Result<()> {
    let bytes = field.as_bytes();
    for (i, _) in bytes.iter().enumerate().filter(|(_, b)| **b == b'%') {
        let valid = bytes.len() > i + 2
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if !valid {
            return Err(LinkError::QueryParseError(format!(
                "field {:?} has an invalid percent escape",
                field
            )));
        }
    }
    Ok(())
}

fn decode_component(s: &str) -> String {
    form_urlencoded::parse(s.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

/// Replace `%20` with `+` in the stem of the link's last path segment.
///
/// The extension and the query are left alone.
pub fn apply_plus_for_space(url: &Url) -> Url {
    let path = url.path();
    let (dir, name) = match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    };
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    };

    if !stem.contains("%20") {
        return url.clone();
    }

    let mut result = url.clone();
    result.set_path(&format!("{}{}{}", dir, stem.replace("%20", "+"), ext));
    result
}
