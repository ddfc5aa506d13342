//! Scanning of rendered definitions for the images they actually declare.

use std::collections::HashMap;

use crate::substitution::strip_image_hash_tag;

const IMAGE_KEY: &str = "image: ";

/// Map every `image: <ref>` in `content` from its bare key to the full reference
pub fn scan_definitions(content: &str) -> HashMap<String, String> {
    let mut definitions = HashMap::new();

    for line in content.lines() {
        let lowered = line.to_lowercase();
        let Some((_, value)) = lowered.split_once(IMAGE_KEY) else {
            continue;
        };

        let image = unquote(value.trim());
        if image.is_empty() {
            continue;
        }
        definitions.insert(strip_image_hash_tag(image), image.to_string());
    }

    definitions
}

fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_definitions() {
        let content = r#"
apiVersion: apps/v1
kind: Deployment
spec:
  template:
    spec:
      containers:
      - name: app
        Image: "taleodor/mafia-express:1.0"
      - name: cache
        image: 'redis@sha256:abc'
      - name: plain
        image: nginx
"#;

        let defs = scan_definitions(content);
        assert_eq!(defs.len(), 3);
        assert_eq!(defs["taleodor/mafia-express"], "taleodor/mafia-express:1.0");
        assert_eq!(defs["redis"], "redis@sha256:abc");
        assert_eq!(defs["nginx"], "nginx");
    }

    #[test]
    fn test_scan_ignores_empty_image_values() {
        let defs = scan_definitions("image: \"\"\nimage:\n");
        assert!(defs.is_empty());
    }
}
