use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A package name, source or binary.
///
/// Names are case-sensitive (`perl-DBI` and `perl-dbi` are different
/// packages), so the input is stored verbatim apart from surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// The name side of a dependency relation (`libfoo.so.1()(64bit)`,
/// `perl(Foo.pm)`, or simply a package name).
///
/// Kept distinct from [`PackageName`] so a requirement is never mistaken for
/// the package that satisfies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyName(String);

impl DependencyName {
    /// Create a new dependency name.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DependencyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DependencyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DependencyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DependencyName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DependencyName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// Every package implicitly provides its own name.
impl From<&PackageName> for DependencyName {
    fn from(name: &PackageName) -> Self {
        Self(name.as_str().to_string())
    }
}

/// Opaque package identity (the repository's 64-bit package hash).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PackageHash(pub u64);

impl std::fmt::Display for PackageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PackageHash {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names_are_case_sensitive() {
        assert_ne!(PackageName::new("perl-DBI"), PackageName::new("perl-dbi"));
        assert_eq!(PackageName::new("  glibc "), "glibc");
    }

    #[test]
    fn package_name_provides_itself() {
        let name = PackageName::new("bash");
        assert_eq!(DependencyName::from(&name).as_str(), "bash");
    }

    #[test]
    fn names_serialize_transparently() {
        let json = serde_json::to_string(&PackageName::new("zlib")).unwrap();
        assert_eq!(json, "\"zlib\"");
        let hash: PackageHash = serde_json::from_str("42").unwrap();
        assert_eq!(hash, PackageHash(42));
    }
}
