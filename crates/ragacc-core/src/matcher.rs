//! Lenient answer matching: case-insensitive substring containment.
//!
//! "847 million" and "$847 million" both satisfy an accepted form of
//! "847 million". Accepted sets must avoid forms that are substrings of
//! other facts the same question could surface.

/// Return the first accepted form found in `response`, if any.
pub fn matched_answer<'a, S: AsRef<str>>(response: &str, accepted: &'a [S]) -> Option<&'a str> {
    let response_lower = response.to_lowercase();
    accepted
        .iter()
        .map(AsRef::as_ref)
        .filter(|form| !form.trim().is_empty())
        .find(|form| response_lower.contains(&form.to_lowercase()))
}

/// Binary verdict, no partial credit.
pub fn is_correct<S: AsRef<str>>(response: &str, accepted: &[S]) -> bool {
    matched_answer(response, accepted).is_some()
}
