use std::cmp::Ordering;

use subtle::{ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

/// Lexicographic comparison that does not branch on the contents of equal-length inputs.
pub(super) fn constant_time_cmp(x: &[u8], y: &[u8]) -> Ordering {
    if x.len() != y.len() {
        return x.len().cmp(&y.len());
    }

    // 0 = equal, 1 = greater, 0xFF = less. Walking backwards lets the first
    // differing byte overwrite any later one.
    let mut result = 0u8;
    for (a, b) in x.iter().zip(y.iter()).rev() {
        let candidate = u8::conditional_select(&0xFF, &1, a.ct_gt(b));
        result = u8::conditional_select(&candidate, &result, a.ct_eq(b));
    }

    match result {
        0 => Ordering::Equal,
        1 => Ordering::Greater,
        _ => Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_cmp_matches_slice_ordering() {
        let cases: [(&[u8], &[u8]); 5] = [
            (&[1, 2, 3], &[1, 2, 3]),
            (&[1, 2, 4], &[1, 2, 3]),
            (&[0, 9, 9], &[1, 0, 0]),
            (&[5, 0, 0], &[4, 255, 255]),
            (&[1, 2], &[1, 2, 0]),
        ];
        for (x, y) in cases {
            assert_eq!(constant_time_cmp(x, y), x.cmp(y), "{x:?} vs {y:?}");
        }
    }
}
