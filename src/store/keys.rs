/// Key layout and encoding utilities for fjall partitions
///
/// Partition structure:
/// - `tasks`: task:{task_id} -> Task (JSON)
/// - `files`: file:{file_name} -> task_id (string)
///
/// The `files` partition is a secondary index so collaborators that only
/// know a produced file name (post-processing uploads) can reach the task.

/// Encode a task key: task:{task_id}
pub fn encode_task_key(task_id: &str) -> Vec<u8> {
    format!("task:{}", task_id).into_bytes()
}

/// Decode a task key: task:{task_id} -> task_id
pub fn decode_task_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("task:").map(String::from)
}

/// Encode a file-index key: file:{file_name}
pub fn encode_file_key(file_name: &str) -> Vec<u8> {
    format!("file:{}", file_name).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_key_encoding() {
        let task_id = "0123456789abcdef01234567";
        let key = encode_task_key(task_id);
        assert_eq!(key, b"task:0123456789abcdef01234567");

        let decoded = decode_task_key(&key).unwrap();
        assert_eq!(decoded, task_id);
    }

    #[test]
    fn test_decode_rejects_foreign_prefix() {
        assert!(decode_task_key(b"file:whatever.mp4").is_none());
    }

    #[test]
    fn test_file_key_encoding() {
        let key = encode_file_key("abc.mp4");
        assert_eq!(key, b"file:abc.mp4");
    }
}
