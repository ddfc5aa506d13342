use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::provenance::INSTANCE_KEY_PREFIX;

/// Where the substituted tags came from, as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceSource {
    pub tag_source_file: Option<String>,
    pub environment: Option<String>,
    pub bundle: Option<String>,
    pub version: Option<String>,
    pub instance: Option<String>,
    pub instance_uri: Option<String>,
    pub revision: Option<String>,
    pub api_key_id: Option<String>,
}

/// Render the two provenance comment lines prepended to rewritten output
pub fn render(tool_version: &str, source: &ProvenanceSource, now: DateTime<Utc>) -> (String, String) {
    let line1 = format!(
        "# Tags replaced with retag version {} on {}",
        tool_version,
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    (line1, describe_source(source))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn describe_source(source: &ProvenanceSource) -> String {
    let revision = present(&source.revision);

    if let Some(file) = present(&source.tag_source_file) {
        return format!("# According to tag source file {}", file);
    }
    if let Some(environment) = present(&source.environment) {
        return format!(
            "# According to the latest approved images in {} environment.",
            environment
        );
    }
    if let (Some(bundle), Some(version)) = (present(&source.bundle), present(&source.version)) {
        return format!("# According to bundle {} version {}", bundle, version);
    }

    let instance = present(&source.instance)
        .map(str::to_string)
        .or_else(|| present(&source.instance_uri).map(|uri| format!("at {}", uri)))
        .or_else(|| {
            present(&source.api_key_id)
                .and_then(instance_from_api_key_id)
                .map(str::to_string)
        });

    match (instance, revision) {
        (Some(instance), Some(revision)) => {
            format!("# According to revision {} of the instance {}", revision, instance)
        }
        (Some(instance), None) => {
            format!("# According to latest approved images for the instance {}", instance)
        }
        (None, _) => "# missing replacetags input".to_string(),
    }
}

/// Instance id embedded in an `INSTANCE__<uuid>` API key id
fn instance_from_api_key_id(api_key_id: &str) -> Option<&str> {
    let rest = api_key_id.strip_prefix(INSTANCE_KEY_PREFIX)?;
    let id = rest.split("__").next().unwrap_or(rest);
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_first_line_has_version_and_rfc3339_time() {
        let (line1, _) = render("0.1.0", &ProvenanceSource::default(), now());
        assert_eq!(
            line1,
            "# Tags replaced with retag version 0.1.0 on 2024-05-01T12:30:00Z"
        );
    }

    #[test]
    fn test_tag_source_file_takes_precedence() {
        let source = ProvenanceSource {
            tag_source_file: Some("sbom.json".to_string()),
            environment: Some("prod".to_string()),
            ..Default::default()
        };
        let (_, line2) = render("0.1.0", &source, now());
        assert_eq!(line2, "# According to tag source file sbom.json");
    }

    #[test]
    fn test_environment_then_bundle() {
        let source = ProvenanceSource {
            environment: Some("prod".to_string()),
            bundle: Some("shop".to_string()),
            version: Some("1.2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe_source(&source),
            "# According to the latest approved images in prod environment."
        );

        let source = ProvenanceSource {
            environment: None,
            ..source
        };
        assert_eq!(describe_source(&source), "# According to bundle shop version 1.2");
    }

    #[test]
    fn test_bundle_requires_version() {
        let source = ProvenanceSource {
            bundle: Some("shop".to_string()),
            ..Default::default()
        };
        assert_eq!(describe_source(&source), "# missing replacetags input");
    }

    #[test]
    fn test_instance_with_and_without_revision() {
        let source = ProvenanceSource {
            instance: Some("inst-1".to_string()),
            revision: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe_source(&source),
            "# According to revision 7 of the instance inst-1"
        );

        let source = ProvenanceSource {
            instance_uri: Some("https://shop.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe_source(&source),
            "# According to latest approved images for the instance at https://shop.example.com"
        );
    }

    #[test]
    fn test_instance_from_api_key_id() {
        let source = ProvenanceSource {
            api_key_id: Some("INSTANCE__2b7c1d2e-4f1a-4c3e-9f7a-0d8e6b5a4c3b".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe_source(&source),
            "# According to latest approved images for the instance 2b7c1d2e-4f1a-4c3e-9f7a-0d8e6b5a4c3b"
        );
        assert!(instance_from_api_key_id("ORGANIZATION__abc").is_none());
    }
}
