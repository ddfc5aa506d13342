#[cfg(test)]
mod tests {
    use super::super::*;
    use std::cell::RefCell;

    fn values() -> ResolvedValues {
        ResolvedValues {
            properties: vec![ResolvedProperty {
                key: "FQDN".to_string(),
                value: "app.example.com".to_string(),
            }],
            secrets: vec![ResolvedSecret {
                key: "DB_PASSWORD".to_string(),
                secret: "AgBy3i4OJSWK".to_string(),
                timestamp: 1_700_000_000,
            }],
        }
    }

    struct RecordingMaterializer {
        calls: RefCell<Vec<(String, String)>>,
    }

    impl PlainSecretMaterializer for RecordingMaterializer {
        fn materialize(&self, sealed: &str, namespace: &str) -> anyhow::Result<String> {
            self.calls
                .borrow_mut()
                .push((sealed.to_string(), namespace.to_string()));
            Ok("hunter2".to_string())
        }
    }

    #[test]
    fn test_parse_tokens() {
        let tokens = parse_tokens(
            "url: https://$RELIZA{PROPERTY.FQDN}/api?pw=$RELIZA{SECRET.DB_PASSWORD:changeme}",
        );

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Property);
        assert_eq!(tokens[0].key, "FQDN");
        assert!(tokens[0].default.is_none());
        assert_eq!(tokens[0].whole_text, "$RELIZA{PROPERTY.FQDN}");

        assert_eq!(tokens[1].kind, TokenKind::Secret);
        assert_eq!(tokens[1].key, "DB_PASSWORD");
        assert_eq!(tokens[1].default.as_deref(), Some("changeme"));
        assert_eq!(tokens[1].whole_text, "$RELIZA{SECRET.DB_PASSWORD:changeme}");
    }

    #[test]
    fn test_parse_plain_secret_and_default_with_colons() {
        let tokens = parse_tokens("a: $RELIZA{PLAINSECRET.TOKEN} b: $RELIZA{PROPERTY.URL:http://x:8080}");
        assert_eq!(tokens[0].kind, TokenKind::PlainSecret);
        assert_eq!(tokens[0].key, "TOKEN");
        assert_eq!(tokens[1].default.as_deref(), Some("http://x:8080"));
    }

    #[test]
    fn test_parse_ignores_unknown_and_unterminated_tokens() {
        assert!(parse_tokens("$RELIZA{OTHER.X} $RELIZA{PROPERTY.OPEN").is_empty());
        assert!(parse_tokens("image: redis").is_empty());
    }

    #[test]
    fn test_secret_props_scan() {
        let sp = SecretProps::scan(
            "a: $RELIZA{PROPERTY.FQDN}\nb: $RELIZA{PROPERTY.FQDN}\nc: $RELIZA{SECRET.DB}\nd: $RELIZA{PLAINSECRET.TLS}\n",
        );
        assert_eq!(sp.properties.len(), 1);
        assert!(sp.properties.contains("FQDN"));
        assert_eq!(sp.secrets.len(), 2);
        assert!(sp.secrets.contains("DB"));
        assert!(sp.secrets.contains("TLS"));
    }

    #[test]
    fn test_resolve_property_and_secret() {
        let values = values();
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        let line = resolver
            .resolve_line("host: $RELIZA{PROPERTY.FQDN} pw: $RELIZA{SECRET.DB_PASSWORD}")
            .unwrap();
        assert_eq!(line, "host: app.example.com pw: AgBy3i4OJSWK");
    }

    #[test]
    fn test_property_default_fallback() {
        let values = ResolvedValues::default();
        let resolver = TokenResolver::new(&values, &NoMaterializer);

        assert_eq!(
            resolver.resolve_line("$RELIZA{PROPERTY.FOO:bar}").unwrap(),
            "bar"
        );
        assert!(matches!(
            resolver.resolve_line("$RELIZA{PROPERTY.FOO}"),
            Err(TokenError::UnresolvedProperty(key)) if key == "FOO"
        ));
    }

    #[test]
    fn test_table_value_wins_over_default() {
        let values = values();
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        assert_eq!(
            resolver.resolve_line("$RELIZA{PROPERTY.FQDN:localhost}").unwrap(),
            "app.example.com"
        );
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let values = ResolvedValues::default();
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        let err = resolver.resolve_line("pw: $RELIZA{SECRET.API_KEY}").unwrap_err();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_secret_default_fallback() {
        let values = ResolvedValues::default();
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        assert_eq!(
            resolver.resolve_line("pw: $RELIZA{SECRET.X:fallback}").unwrap(),
            "pw: fallback"
        );
        assert_eq!(
            resolver.resolve_line("pw: $RELIZA{PLAINSECRET.X:fallback}").unwrap(),
            "pw: fallback"
        );
    }

    #[test]
    fn test_empty_secret_uses_default() {
        let values = ResolvedValues {
            properties: Vec::new(),
            secrets: vec![ResolvedSecret {
                key: "X".to_string(),
                secret: String::new(),
                timestamp: 1_700_000_000,
            }],
        };
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        assert_eq!(
            resolver.resolve_line("pw: $RELIZA{SECRET.X:fallback}").unwrap(),
            "pw: fallback"
        );
        assert_eq!(resolver.resolve_line("pw: $RELIZA{SECRET.X}").unwrap(), "pw: ");
    }

    #[test]
    fn test_for_diff_keeps_secret_default() {
        let values = ResolvedValues::default();
        let resolver = TokenResolver::new(&values, &NoMaterializer).with_for_diff(true);
        assert_eq!(
            resolver.resolve_line("pw: $RELIZA{SECRET.X:fallback}").unwrap(),
            "pw: fallback"
        );
    }

    #[test]
    fn test_for_diff_uses_timestamp() {
        let values = values();
        let resolver = TokenResolver::new(&values, &NoMaterializer).with_for_diff(true);
        assert_eq!(
            resolver.resolve_line("pw: $RELIZA{SECRET.DB_PASSWORD}").unwrap(),
            "pw: 1700000000"
        );
    }

    #[test]
    fn test_plain_secret_uses_materializer() {
        let values = values();
        let materializer = RecordingMaterializer {
            calls: RefCell::new(Vec::new()),
        };
        let resolver = TokenResolver::new(&values, &materializer).with_namespace("prod");

        let line = resolver
            .resolve_line("pw: $RELIZA{PLAINSECRET.DB_PASSWORD}")
            .unwrap();
        assert_eq!(line, "pw: hunter2");
        assert_eq!(
            materializer.calls.borrow().as_slice(),
            &[("AgBy3i4OJSWK".to_string(), "prod".to_string())]
        );
    }

    #[test]
    fn test_plain_secret_without_materializer_fails() {
        let values = values();
        let resolver = TokenResolver::new(&values, &NoMaterializer);
        assert!(matches!(
            resolver.resolve_line("$RELIZA{PLAINSECRET.DB_PASSWORD}"),
            Err(TokenError::PlainSecret { .. })
        ));
    }

    #[test]
    fn test_resolved_values_json_shape() {
        let json = r#"{
            "properties": [{"key": "FQDN", "value": "x.io"}],
            "secrets": [{"key": "DB", "value": "sealed", "lastUpdated": 42}]
        }"#;
        let values: ResolvedValues = serde_json::from_str(json).unwrap();
        assert_eq!(values.properties[0].value, "x.io");
        assert_eq!(values.secrets[0].secret, "sealed");
        assert_eq!(values.secrets[0].timestamp, 42);
    }
}
