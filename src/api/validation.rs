//! Request-shape validation helpers
//!
//! Pure functions, checked before any store access: an invalid task id never
//! reaches fjall, and a traversal-shaped media name never reaches the
//! filesystem.

/// Task ids are 24 lowercase/uppercase hex characters, the shape assigned by
/// the store. Anything else is rejected before a lookup happens.
pub fn is_valid_task_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Media names must be a single path segment. Names with `..` or a path
/// separator are rejected; callers report them as not-found rather than
/// forbidden so the response leaks nothing about the filesystem.
pub fn is_valid_media_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_store_shaped_ids() {
        assert!(is_valid_task_id("0123456789abcdef01234567"));
        assert!(is_valid_task_id("ABCDEF0123456789abcdef01"));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_task_id(""));
        assert!(!is_valid_task_id("0123456789abcdef0123456")); // 23 chars
        assert!(!is_valid_task_id("0123456789abcdef012345678")); // 25 chars
        assert!(!is_valid_task_id("0123456789abcdef0123456g")); // non-hex
        assert!(!is_valid_task_id("../../../../etc/passwd42"));
    }

    #[test]
    fn accepts_plain_file_names() {
        assert!(is_valid_media_name("abc.mp4"));
        assert!(is_valid_media_name("0123456789abcdef01234567.m4a"));
    }

    #[test]
    fn rejects_traversal_names() {
        assert!(!is_valid_media_name(""));
        assert!(!is_valid_media_name(".."));
        assert!(!is_valid_media_name("../etc/passwd"));
        assert!(!is_valid_media_name("a/b"));
        assert!(!is_valid_media_name("a\\b"));
        assert!(!is_valid_media_name("..hidden.mp4"));
        assert!(!is_valid_media_name("a\0b"));
    }
}
