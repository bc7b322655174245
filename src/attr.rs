//! Attribute-list codec.
//!
//! An attribute list is `NAME=VALUE[,NAME=VALUE...]` where a quoted VALUE
//! may itself contain commas (RFC 8216, 4.2). This module splits and joins
//! such lists and provides the low-level tag writers the encoders build on.

use std::io::Write;

use crate::error::{Error, Result};
use crate::tags::Tag;
use crate::value::{UnquotedStr, Value};

/// Split an attribute payload on commas, ignoring commas inside `"..."`
/// spans.
///
/// With `max > 0`, at most `max` items are returned and the final item takes
/// the remainder of the payload verbatim. `EXTINF` relies on this: its title
/// may contain commas.
pub(crate) fn split_attributes(s: &str, max: usize) -> Vec<&str> {
    if s.is_empty() {
        return vec![""];
    }

    let mut items = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                if max > 0 && items.len() == max - 1 {
                    items.push(&s[start..]);
                    start = s.len();
                    break;
                }
                items.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() {
        items.push(&s[start..]);
    }

    items
}

/// Split one `NAME=VALUE` item on the first `=` and validate the name
/// against `[A-Z0-9-]+` (RFC 8216, 4.2).
pub(crate) fn parse_attribute(item: &str) -> Result<(&str, &str)> {
    let (name, value) = item.split_once('=').ok_or(Error::InvalidAttribute)?;
    if name.is_empty() {
        return Err(Error::InvalidAttributeName);
    }
    if value.is_empty() {
        return Err(Error::InvalidAttributeValue);
    }
    check_attribute_name(name)?;
    Ok((name, value))
}

pub(crate) fn check_attribute_name(name: &str) -> Result<()> {
    if name.bytes().all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-')) {
        Ok(())
    } else {
        Err(Error::InvalidAttributeName)
    }
}

/// Split `s` and feed each `(name, value)` pair to `f`. Errors returned by
/// `f` are wrapped with the offending attribute name.
pub(crate) fn iter_attributes<F>(s: &str, max: usize, mut f: F) -> Result<()>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    for item in split_attributes(s, max) {
        let (name, value) = parse_attribute(item)?;
        f(name, value).map_err(|e| e.context(name))?;
    }
    Ok(())
}

/// One `NAME=VALUE` pair for [`write_attrs`].
pub(crate) struct Attr<'a> {
    name: &'static str,
    value: &'a dyn Value,
}

impl<'a> Attr<'a> {
    pub(crate) fn new(name: &'static str, value: &'a dyn Value) -> Self {
        Attr { name, value }
    }
}

/// Emit the non-zero attributes separated by commas. With `first`, the first
/// emitted attribute is not preceded by a comma.
pub(crate) fn write_attrs(w: &mut dyn Write, first: bool, attrs: &[Attr<'_>]) -> Result<()> {
    let mut written = 0usize;
    for attr in attrs {
        if attr.value.is_zero() {
            continue;
        }
        if !first || written > 0 {
            w.write_all(b",")?;
        }
        write_attr(w, attr.name, attr.value).map_err(|e| e.context(attr.name))?;
        written += 1;
    }
    Ok(())
}

fn write_attr(w: &mut dyn Write, name: &str, value: &dyn Value) -> Result<()> {
    check_attribute_name(name)?;
    UnquotedStr(name).encode(w)?;
    w.write_all(b"=")?;
    value.encode(w)
}

/// Emit `#TAG:<value>\n`, skipping zero values. Errors carry the tag name.
pub(crate) fn write_tag(w: &mut dyn Write, tag: Tag, value: &dyn Value) -> Result<()> {
    if value.is_zero() {
        return Ok(());
    }

    let write = |w: &mut dyn Write| -> Result<()> {
        w.write_all(tag.as_str().as_bytes())?;
        w.write_all(b":")?;
        value.encode(w)?;
        w.write_all(b"\n")?;
        Ok(())
    };
    write(w).map_err(|e| e.context(tag.as_str()))
}

/// Emit a bare `#TAG\n` line when `flag` is set.
pub(crate) fn write_flag_tag(w: &mut dyn Write, tag: Tag, flag: bool) -> Result<()> {
    if flag {
        w.write_all(tag.as_str().as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_max_and_trailing_commas() {
        assert_eq!(split_attributes("10", 2), vec!["10"]);
        assert_eq!(split_attributes("10,", 2), vec!["10"]);
        assert_eq!(split_attributes("10,title", 2), vec!["10", "title"]);
        assert_eq!(split_attributes("10,title,", 2), vec!["10", "title,"]);
    }

    #[test]
    fn split_ignores_commas_in_quotes() {
        assert_eq!(split_attributes("A=1", 0), vec!["A=1"]);
        assert_eq!(split_attributes("A=1,B=2,", 0), vec!["A=1", "B=2"]);
        assert_eq!(split_attributes("A=1,CODECS=\"mp4a\"", 0), vec!["A=1", "CODECS=\"mp4a\""]);
        assert_eq!(
            split_attributes("A=1,CODECS=\"mp4a,mp4b\"", 0),
            vec!["A=1", "CODECS=\"mp4a,mp4b\""]
        );
        assert_eq!(
            split_attributes("K1=V1,K2=\"a,b\",K3=V3", 0),
            vec!["K1=V1", "K2=\"a,b\"", "K3=V3"]
        );
    }

    #[test]
    fn parse_attribute_validates_name_and_value() {
        assert_eq!(parse_attribute("BANDWIDTH=1280000").unwrap(), ("BANDWIDTH", "1280000"));
        assert_eq!(parse_attribute("URI=\"a=b\"").unwrap(), ("URI", "\"a=b\""));

        assert!(matches!(parse_attribute("BANDWIDTH"), Err(Error::InvalidAttribute)));
        assert!(matches!(parse_attribute("=1"), Err(Error::InvalidAttributeName)));
        assert!(matches!(parse_attribute("bandwidth=1"), Err(Error::InvalidAttributeName)));
        assert!(matches!(parse_attribute("BANDWIDTH="), Err(Error::InvalidAttributeValue)));
    }

    #[test]
    fn iter_attributes_wraps_errors_with_the_name() {
        let err = iter_attributes("A=1,B=2", 0, |name, _| {
            if name == "B" {
                Err(Error::InvalidBool)
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "B: invalid bool");
    }
}
