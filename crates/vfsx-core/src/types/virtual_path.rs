//! Virtual path handling for namespace-qualified archive entries.
//!
//! Archive entries are addressed as `<namespace>:<path>`. Separators are
//! normalized to `/` before any comparison, and prefix matching ignores ASCII
//! case.

use std::borrow::Cow;

/// Normalizes path separators to `/`.
///
/// # Examples
///
/// ```
/// use vfsx_core::types::virtual_path::normalize;
///
/// assert_eq!(normalize(r"data:sound\music\a.ogg"), "data:sound/music/a.ogg");
/// assert_eq!(normalize("data:a/b"), "data:a/b");
/// ```
#[must_use]
pub fn normalize(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Strips everything up to and including the first `:`.
///
/// Paths without a namespace qualifier are returned unchanged.
///
/// # Examples
///
/// ```
/// use vfsx_core::types::virtual_path::strip_namespace;
///
/// assert_eq!(strip_namespace("data:sound/a.ogg"), "sound/a.ogg");
/// assert_eq!(strip_namespace("locale:en:us/a.txt"), "en:us/a.txt");
/// assert_eq!(strip_namespace("plain/a.txt"), "plain/a.txt");
/// ```
#[must_use]
pub fn strip_namespace(path: &str) -> &str {
    path.split_once(':').map_or(path, |(_, rest)| rest)
}

/// Returns `true` if `path` carries a non-empty namespace qualifier.
#[must_use]
pub fn has_namespace(path: &str) -> bool {
    path.split_once(':').is_some_and(|(ns, _)| !ns.is_empty())
}

/// Ordered set of virtual-path prefixes matched case-insensitively.
///
/// Prefixes are normalized once at construction. Matching returns the index
/// of the first prefix that applies; later prefixes are not consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSet {
    prefixes: Vec<String>,
}

impl PrefixSet {
    /// Builds a prefix set, normalizing separators of every prefix.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| normalize(p.as_ref()).into_owned())
                .collect(),
        }
    }

    /// Returns the index of the first prefix that `path` starts with.
    ///
    /// `path` must already be normalized.
    ///
    /// # Examples
    ///
    /// ```
    /// use vfsx_core::PrefixSet;
    ///
    /// let set = PrefixSet::new(["data:Sound/", "data:locale/"]);
    /// assert_eq!(set.first_match("DATA:sound/a.ogg"), Some(0));
    /// assert_eq!(set.first_match("data:locale/en/a.txt"), Some(1));
    /// assert_eq!(set.first_match("data:video/a.bik"), None);
    /// ```
    #[must_use]
    pub fn first_match(&self, path: &str) -> Option<usize> {
        self.prefixes
            .iter()
            .position(|prefix| starts_with_ignore_ascii_case(path, prefix))
    }

    /// Returns `true` if `path` starts with any prefix.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.first_match(path).is_some()
    }

    /// Returns `true` if the set holds no prefixes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Number of prefixes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Iterates the normalized prefixes in match order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }
}

fn starts_with_ignore_ascii_case(path: &str, prefix: &str) -> bool {
    path.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}
