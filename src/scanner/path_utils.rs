//! Unicode path normalization utilities.
//!
//! Path identities are hashes of root-relative path strings, so the same
//! logical file must always produce the same string. Two things get in the way:
//!
//! - macOS reports names in NFD (decomposed) form while Linux and Windows
//!   usually hand out NFC (composed) names, so `café.txt` can arrive as two
//!   different byte sequences.
//! - Windows separates components with `\`, everything else with `/`.
//!
//! Everything here folds those differences away.
//!
//! # Example
//!
//! ```
//! use dupindex::scanner::path_utils::{normalize_path_str, portable_path_string};
//! use std::path::Path;
//!
//! let nfc = "café.txt";
//! let nfd = "cafe\u{0301}.txt";
//! assert_eq!(normalize_path_str(nfc), normalize_path_str(nfd));
//!
//! assert_eq!(portable_path_string(Path::new("./docs/cafe\u{0301}.txt")), "docs/café.txt");
//! ```

use std::borrow::Cow;
use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;

/// Normalize a path string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalize a path string to NFC, borrowing when it already is.
///
/// Most names on Linux are already NFC, so the common case allocates nothing.
#[must_use]
pub fn normalize_path_str_cow(s: &str) -> Cow<'_, str> {
    if unicode_normalization::is_nfc(s) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(normalize_path_str(s))
    }
}

/// Check if two path strings are equal after NFC normalization.
#[must_use]
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path_str_cow(a) == normalize_path_str_cow(b)
}

/// Render a path as a platform-independent string.
///
/// Components are NFC-normalized and joined with `/`. `.` components are
/// dropped, so `./a/b` and `a/b` render identically. Root and prefix
/// components (for absolute paths) are kept as a leading `/` so that an
/// absolute path can never collide with a relative one.
///
/// Names that are not valid UTF-8 are rendered lossily; the walker reports
/// such files instead of yielding them, so they never reach an identity.
#[must_use]
pub fn portable_path_string(path: &Path) -> String {
    let mut out = String::new();
    let mut absolute = false;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                out.push_str(&prefix.as_os_str().to_string_lossy());
                absolute = true;
            }
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => push_component(&mut out, absolute, ".."),
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                push_component(&mut out, absolute, &normalize_path_str_cow(&name));
            }
        }
    }

    if absolute && out.is_empty() {
        out.push('/');
    }
    out
}

fn push_component(out: &mut String, absolute: bool, name: &str) {
    if !out.is_empty() || absolute {
        out.push('/');
    }
    out.push_str(name);
}
