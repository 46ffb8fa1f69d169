//! Natural ("human") ordering of page names.
//!
//! Names are split into maximal runs of ASCII digits and maximal runs of
//! everything else. Runs are compared pairwise: digit runs by numeric value
//! (ties broken by run length, shorter first), other runs case-insensitively
//! by code point. The first differing pair decides; a name whose runs are a
//! strict prefix of the other's sorts first. Names that still compare equal
//! fall back to a plain byte comparison so the result is a total order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// A maximal run of either digits or non-digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Runs<'a> {
    rest: &'a str,
}
impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Run<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(self.rest.len(), |(i, _)| i);
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits { Run::Digits(run) } else { Run::Text(run) })
    }
}

fn runs(s: &str) -> Runs<'_> {
    Runs { rest: s }
}

/// Compare two digit runs by value without parsing them into a fixed-width
/// integer, so arbitrarily long runs cannot overflow.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        // "2" before "002"
        .then_with(|| a.len().cmp(&b.len()))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars().flat_map(char::to_lowercase).cmp(b.chars().flat_map(char::to_lowercase))
}

fn cmp_run(a: Run<'_>, b: Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Digits(a), Run::Digits(b)) => cmp_digits(a, b),
        (Run::Text(a) | Run::Digits(a), Run::Text(b) | Run::Digits(b)) => cmp_text(a, b),
    }
}

/// Compare two names in natural reading order.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use tankobon_archive::natural_cmp;
///
/// assert_eq!(natural_cmp("page2.jpg", "page10.jpg"), Ordering::Less);
/// assert_eq!(natural_cmp("Page1.jpg", "page1.jpg"), Ordering::Less); // byte tie-break
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => match cmp_run(l, r) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return a.as_bytes().cmp(b.as_bytes()),
        }
    }
}

/// Natural comparison of two paths using their (lossy UTF-8) full text.
pub fn natural_path_cmp(a: &Path, b: &Path) -> Ordering {
    natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
}

/// Sort names in place in natural order.
pub fn sort_naturally<T: AsRef<str>>(names: &mut [T]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

/// Sort paths in place in natural order of their full path.
pub fn sort_paths_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_path_cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sorted(input: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = input.iter().map(ToString::to_string).collect();
        sort_naturally(&mut names);
        names
    }

    #[test]
    fn test_unpadded_numbers() {
        assert_eq!(
            sorted(&["page10.jpg", "page2.jpg", "page1.jpg", "page20.jpg"]),
            ["page1.jpg", "page2.jpg", "page10.jpg", "page20.jpg"]
        );
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(sorted(&["Page10.jpg", "page2.jpg", "PAGE1.jpg"]), ["PAGE1.jpg", "page2.jpg", "Page10.jpg"]);
    }

    #[test]
    fn test_nested_paths() {
        assert_eq!(
            sorted(&["vol2/p1.png", "vol10/p1.png", "vol1/p10.png", "vol1/p9.png"]),
            ["vol1/p9.png", "vol1/p10.png", "vol2/p1.png", "vol10/p1.png"]
        );
    }

    #[rstest]
    #[case("a2", "a10", Ordering::Less)]
    #[case("a10", "a2", Ordering::Greater)]
    #[case("2", "002", Ordering::Less)]
    #[case("002", "2", Ordering::Greater)]
    #[case("a", "a1", Ordering::Less)]
    #[case("img", "IMG", Ordering::Greater)]
    #[case("abc", "ABD", Ordering::Less)]
    #[case("x.jpg", "x.jpg", Ordering::Equal)]
    #[case("", "", Ordering::Equal)]
    #[case("", "a", Ordering::Less)]
    #[case("1", "a", Ordering::Less)]
    #[case("ch1_p3", "ch1_p03", Ordering::Less)]
    #[case("99999999999999999999999", "100000000000000000000000", Ordering::Less)]
    fn test_natural_cmp(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(natural_cmp(a, b), expected);
    }

    #[test]
    fn test_antisymmetric_and_equal_only_when_identical() {
        let names = [
            "page1.jpg", "Page1.jpg", "page01.jpg", "page001.jpg", "page10.jpg", "page1a.jpg", "page1.JPG", "p", "P",
            "10", "010", "a-1", "a_1", "",
        ];
        for a in names {
            for b in names {
                let forward = natural_cmp(a, b);
                assert_eq!(forward, natural_cmp(b, a).reverse(), "{a:?} vs {b:?}");
                assert_eq!(forward == Ordering::Equal, a == b, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_transitive_over_sorted_output() {
        let names = sorted(&["b2", "B10", "a01", "a1", "A1", "a", "b02", "10", "9", "b2x"]);
        for window in names.windows(2) {
            assert_ne!(natural_cmp(&window[0], &window[1]), Ordering::Greater);
        }
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_eq!(natural_cmp(a, b), Ordering::Less, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_sort_paths() {
        let mut paths = vec![PathBuf::from("dir/10.png"), PathBuf::from("dir/9.png"), PathBuf::from("a/1.png")];
        sort_paths_naturally(&mut paths);
        assert_eq!(paths, [PathBuf::from("a/1.png"), PathBuf::from("dir/9.png"), PathBuf::from("dir/10.png")]);
    }
}
