// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mapping between typed records and the flat field maps held by the store.
//!
//! A record opts in by implementing [`Record`], listing one [`FieldDescriptor`] per cached field.
//! Integer fields are written as decimal text, string fields as-is. Descriptors of any other kind
//! are recognized but never written or read.
//!
//! Decoding is deliberately forgiving: integer fields accept surrounding whitespace, the empty
//! string (zero) and the words `true` and `false`. Map entries that match no descriptor are
//! ignored.

use std::fmt;

use takecache_store::FieldMap;

use crate::Error;

/// The scalar value that marks a key as confirmed absent upstream.
pub const PLACEHOLDER: &str = "*";

const INDEXED: &str = "indexed";

/// Returns `true` if a stored scalar is the negative-cache placeholder.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    value == PLACEHOLDER
}

/// A record that can be stored as a field map.
///
/// # Examples
///
/// ```
/// use takecache::codec::{FieldDescriptor, Record};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct User {
///     id: i64,
///     name: String,
///     scores: Vec<u32>,
/// }
///
/// impl Record for User {
///     const FIELDS: &'static [FieldDescriptor<Self>] = &[
///         FieldDescriptor::int("id", |u: &User| u.id, |u: &mut User, v| u.id = v),
///         FieldDescriptor::string("name,indexed", |u: &User| u.name.clone(), |u: &mut User, v| u.name = v),
///         FieldDescriptor::other("scores"),
///     ];
/// }
///
/// let user = User { id: 1, name: "a".into(), scores: vec![3] };
/// let fields = takecache::codec::encode(&user).unwrap();
/// assert_eq!(fields.len(), 2);
/// assert_eq!(fields["id"], "1");
/// ```
pub trait Record: Default + 'static {
    /// The cached fields of the record, in declaration order.
    const FIELDS: &'static [FieldDescriptor<Self>];
}

/// The value kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A signed integer, written as decimal text.
    Int,
    /// A string, written verbatim.
    Str,
    /// Any other kind; skipped by the codec.
    Other,
}

enum Accessor<R> {
    Int { get: fn(&R) -> i64, set: fn(&mut R, i64) },
    Str { get: fn(&R) -> String, set: fn(&mut R, String) },
    Other,
}

/// Describes one field of a [`Record`]: its cache tag and how to read and write it.
pub struct FieldDescriptor<R> {
    tag: &'static str,
    accessor: Accessor<R>,
}

impl<R> FieldDescriptor<R> {
    /// Describes an integer field.
    #[must_use]
    pub const fn int(tag: &'static str, get: fn(&R) -> i64, set: fn(&mut R, i64)) -> Self {
        Self {
            tag,
            accessor: Accessor::Int { get, set },
        }
    }

    /// Describes a string field.
    #[must_use]
    pub const fn string(tag: &'static str, get: fn(&R) -> String, set: fn(&mut R, String)) -> Self {
        Self {
            tag,
            accessor: Accessor::Str { get, set },
        }
    }

    /// Describes a field of a kind the codec does not serialize.
    #[must_use]
    pub const fn other(tag: &'static str) -> Self {
        Self {
            tag,
            accessor: Accessor::Other,
        }
    }

    /// Returns the raw cache tag.
    #[must_use]
    pub fn raw_tag(&self) -> &'static str {
        self.tag
    }

    /// Parses the cache tag.
    ///
    /// # Errors
    ///
    /// Returns a [`Codec`](crate::ErrorKind::Codec) error if the tag has no name.
    pub fn tag(&self) -> Result<FieldTag<'static>, Error> {
        FieldTag::parse(self.tag)
    }

    /// Returns the value kind of the field.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self.accessor {
            Accessor::Int { .. } => FieldKind::Int,
            Accessor::Str { .. } => FieldKind::Str,
            Accessor::Other => FieldKind::Other,
        }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("tag", &self.tag)
            .field("kind", &self.kind())
            .finish()
    }
}

/// A parsed cache tag of the form `name[,option,...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag<'a> {
    name: &'a str,
    indexed: bool,
}

impl<'a> FieldTag<'a> {
    /// Parses a tag. The `indexed` option is recorded; any other option is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`Codec`](crate::ErrorKind::Codec) error if the name part is empty.
    pub fn parse(tag: &'a str) -> Result<Self, Error> {
        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(Error::codec(format!("field tag '{tag}' has no name")));
        }

        let indexed = parts.any(|option| option.trim() == INDEXED);
        if indexed {
            tracing::trace!(field.name = name, "indexed field tag has no secondary index");
        }

        Ok(Self { name, indexed })
    }

    /// Returns the field name used as the map key.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns `true` if the tag carries the `indexed` option.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

/// Encodes a record into a field map.
///
/// # Errors
///
/// Returns a [`Codec`](crate::ErrorKind::Codec) error if any descriptor has a malformed tag.
pub fn encode<R: Record>(record: &R) -> Result<FieldMap, Error> {
    let mut fields = FieldMap::new();
    for descriptor in R::FIELDS {
        let tag = descriptor.tag()?;
        let value = match &descriptor.accessor {
            Accessor::Int { get, .. } => get(record).to_string(),
            Accessor::Str { get, .. } => get(record),
            Accessor::Other => continue,
        };
        fields.insert(tag.name().to_owned(), value);
    }
    Ok(fields)
}

/// Decodes a field map into `target`, overwriting the fields it populates.
///
/// An empty map carries no data and leaves `target` untouched.
///
/// # Errors
///
/// Returns a [`Decode`](crate::ErrorKind::Decode) error if a value cannot be coerced to its field
/// kind or a non-empty map populates no field, and a [`Codec`](crate::ErrorKind::Codec) error if
/// any descriptor has a malformed tag.
pub fn decode<R: Record>(fields: &FieldMap, target: &mut R) -> Result<(), Error> {
    if fields.is_empty() {
        return Ok(());
    }

    let mut populated = 0_usize;
    for descriptor in R::FIELDS {
        let tag = descriptor.tag()?;
        let Some(value) = fields.get(tag.name()) else {
            continue;
        };

        match &descriptor.accessor {
            Accessor::Int { set, .. } => {
                let number = coerce_int(value)
                    .ok_or_else(|| Error::decode(format!("field '{}' holds non-integer value '{value}'", tag.name())))?;
                set(target, number);
            }
            Accessor::Str { set, .. } => set(target, value.clone()),
            Accessor::Other => continue,
        }
        populated += 1;
    }

    if populated == 0 {
        return Err(Error::decode(format!("none of {} stored fields match the record", fields.len())));
    }
    Ok(())
}

/// Weakly coerces text to an integer.
///
/// Accepts decimal text with surrounding whitespace, the empty string as zero, and `true` and
/// `false` as one and zero.
#[must_use]
pub fn coerce_int(value: &str) -> Option<i64> {
    match value.trim() {
        "" | "false" => Some(0),
        "true" => Some(1),
        text => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        tags: Vec<String>,
    }

    impl Record for User {
        const FIELDS: &'static [FieldDescriptor<Self>] = &[
            FieldDescriptor::int("id", |u: &User| u.id, |u: &mut User, v| u.id = v),
            FieldDescriptor::string("name,indexed", |u: &User| u.name.clone(), |u: &mut User, v| u.name = v),
            FieldDescriptor::other("tags"),
        ];
    }

    #[derive(Debug, Default)]
    struct Untagged {
        value: i64,
    }

    impl Record for Untagged {
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor::int(",indexed", |r: &Untagged| r.value, |r: &mut Untagged, v| {
            r.value = v;
        })];
    }

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn encode_writes_int_and_string_fields_only() {
        let user = User {
            id: 42,
            name: "ada".to_owned(),
            tags: vec!["x".to_owned()],
        };

        let fields = encode(&user).unwrap();

        assert_eq!(fields, map(&[("id", "42"), ("name", "ada")]));
    }

    #[test]
    fn decode_assigns_matching_fields() {
        let mut user = User::default();
        decode(&map(&[("id", "7"), ("name", "bob"), ("unknown", "ignored")]), &mut user).unwrap();

        assert_eq!(user.id, 7);
        assert_eq!(user.name, "bob");
        assert!(user.tags.is_empty());
    }

    #[test]
    fn decode_empty_map_is_no_data() {
        let mut user = User {
            id: 3,
            ..User::default()
        };
        decode(&FieldMap::new(), &mut user).unwrap();
        assert_eq!(user.id, 3);
    }

    #[test]
    fn decode_without_matching_fields_fails() {
        let mut user = User::default();
        let error = decode(&map(&[("garbage", "1")]), &mut user).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[test]
    fn decode_uncoercible_int_fails() {
        let mut user = User::default();
        let error = decode(&map(&[("id", "twelve")]), &mut user).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
        assert!(error.to_string().contains("twelve"));
    }

    #[test]
    fn decode_only_other_fields_fails() {
        let mut user = User::default();
        let error = decode(&map(&[("tags", "a,b")]), &mut user).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[test]
    fn coerce_int_is_weak() {
        assert_eq!(coerce_int("12"), Some(12));
        assert_eq!(coerce_int("  -5 "), Some(-5));
        assert_eq!(coerce_int(""), Some(0));
        assert_eq!(coerce_int("true"), Some(1));
        assert_eq!(coerce_int("false"), Some(0));
        assert_eq!(coerce_int("1.5"), None);
        assert_eq!(coerce_int("abc"), None);
    }

    #[test]
    fn tag_parsing() {
        let tag = FieldTag::parse("name,indexed").unwrap();
        assert_eq!(tag.name(), "name");
        assert!(tag.is_indexed());

        let tag = FieldTag::parse("id,omitempty").unwrap();
        assert_eq!(tag.name(), "id");
        assert!(!tag.is_indexed());

        let tag = FieldTag::parse("plain").unwrap();
        assert_eq!(tag.name(), "plain");
        assert!(!tag.is_indexed());
    }

    #[test]
    fn empty_tag_name_is_codec_error() {
        assert_eq!(FieldTag::parse("").unwrap_err().kind(), ErrorKind::Codec);
        assert_eq!(FieldTag::parse(",indexed").unwrap_err().kind(), ErrorKind::Codec);

        let error = encode(&Untagged { value: 1 }).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Codec);

        let error = decode(&map(&[("value", "1")]), &mut Untagged::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Codec);
    }

    #[test]
    fn descriptor_reports_kind() {
        let kinds: Vec<_> = User::FIELDS.iter().map(FieldDescriptor::kind).collect();
        assert_eq!(kinds, [FieldKind::Int, FieldKind::Str, FieldKind::Other]);
        assert_eq!(User::FIELDS[1].raw_tag(), "name,indexed");
        assert!(format!("{:?}", User::FIELDS[0]).contains("Int"));
    }

    #[test]
    fn placeholder_is_star() {
        assert_eq!(PLACEHOLDER, "*");
        assert!(is_placeholder("*"));
        assert!(!is_placeholder("\"*\""));
        assert!(!is_placeholder(""));
    }
}
