//! Natural ordering for dotted curriculum codes.
//!
//! Codes such as `C2.10.3` are compared segment by segment on `.`. Inside a
//! segment, runs of ASCII digits compare numerically and other runs compare
//! by byte order, so `C2.2` sorts before `C2.10` and `C9` before `C10`.
//! A code that is a strict prefix of another sorts first.
//!
//! Non-numeric suffixes (`C2.1a` vs `C2.1b`) fall back to plain byte order
//! for their text runs; no locale collation is applied.

use std::cmp::Ordering;

/// Compare two dotted codes in natural order.
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_segment(l, r) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Whether `code` lies strictly under `chapter_code` (`"{chapter}.%"`).
pub fn is_within_chapter(code: &str, chapter_code: &str) -> bool {
    code.strip_prefix(chapter_code)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    let mut left = Runs { rest: a };
    let mut right = Runs { rest: b };
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_run(l, r) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

fn compare_run(a: &str, b: &str) -> Ordering {
    let a_digits = a.starts_with(|c: char| c.is_ascii_digit());
    let b_digits = b.starts_with(|c: char| c.is_ascii_digit());
    match (a_digits, b_digits) {
        (true, true) => {
            let a_trim = a.trim_start_matches('0');
            let b_trim = b.trim_start_matches('0');
            a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim))
                .then_with(|| a.len().cmp(&b.len()))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// Splits a segment into alternating digit / non-digit runs.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digit)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(run)
    }
}
