/// Registry constants for image reference normalization
pub mod registry {
    /// Registry assumed when a reference names none
    pub const DEFAULT: &str = "docker.io";

    /// Prefix stripped when matching references against Docker Hub keys
    pub const DEFAULT_PREFIX: &str = "docker.io/";

    /// Prefix stripped when matching official Docker Hub images
    pub const LIBRARY_PREFIX: &str = "docker.io/library/";

    /// Namespace of official Docker Hub images
    pub const LIBRARY_NAMESPACE: &str = "library/";

    /// URL schemes removed from references before keying them
    pub const SCHEMES: [&str; 3] = ["http://", "https://", "oci://"];
}

/// Placeholder token constants
pub mod token {
    /// Opening marker of every placeholder
    pub const MARKER: &str = "$RELIZA{";

    /// Closing delimiter of a placeholder
    pub const CLOSE: char = '}';

    /// Separator between key and default value
    pub const DEFAULT_SEPARATOR: char = ':';
}

/// CycloneDX constants
pub mod cyclonedx {
    /// Component type carrying container images
    pub const CONTAINER: &str = "container";

    /// Package URL prefix for Docker images
    pub const PURL_PREFIX: &str = "pkg:docker/";

    /// Package URL qualifier naming the registry
    pub const REPOSITORY_URL: &str = "repository_url=";

    /// Hash algorithm accepted as an image digest
    pub const SHA256_ALG: &str = "SHA-256";
}

/// Provenance constants
pub mod provenance {
    /// API key id prefix used by instance-scoped keys
    pub const INSTANCE_KEY_PREFIX: &str = "INSTANCE__";
}
