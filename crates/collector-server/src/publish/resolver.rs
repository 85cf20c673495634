//! Archive type classification and topic resolution

use regex::Regex;
use std::sync::OnceLock;

use crate::config::KafkaConfig;
use crate::error::CollectorError;

/// The archive types this collector consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Translated event records (`*.translation.export.CSV.zip`)
    TranslationExport,
    /// Translated mention records (`*.translation.mentions.CSV.zip`)
    TranslationMentions,
}

impl ArchiveKind {
    /// Classify an archive by its filename or URL. Returns `None` for
    /// unsupported archive types.
    pub fn from_name(name: &str) -> Option<Self> {
        if export_pattern().is_match(name) {
            Some(ArchiveKind::TranslationExport)
        } else if mentions_pattern().is_match(name) {
            Some(ArchiveKind::TranslationMentions)
        } else {
            None
        }
    }
}

fn export_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"translation\.export\.CSV\.zip$").expect("static pattern is valid")
    })
}

fn mentions_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"translation\.mentions\.CSV\.zip$").expect("static pattern is valid")
    })
}

/// Maps archive names to destination Kafka topics
#[derive(Debug, Clone)]
pub struct TopicResolver {
    translation_export_topic: String,
    translation_mentions_topic: String,
}

impl TopicResolver {
    pub fn new(config: &KafkaConfig) -> Self {
        Self {
            translation_export_topic: config.translation_export_topic.clone(),
            translation_mentions_topic: config.translation_mentions_topic.clone(),
        }
    }

    /// The topic for an archive, or `UnknownArchiveType` when the filename
    /// matches no supported pattern.
    pub fn resolve(&self, archive_file_name: &str) -> Result<&str, CollectorError> {
        match ArchiveKind::from_name(archive_file_name) {
            Some(ArchiveKind::TranslationExport) => Ok(&self.translation_export_topic),
            Some(ArchiveKind::TranslationMentions) => Ok(&self.translation_mentions_topic),
            None => Err(CollectorError::UnknownArchiveType(
                archive_file_name.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> KafkaConfig {
        KafkaConfig {
            bootstrap_servers: "localhost:9092".to_string(),
            translation_export_topic: "collector-event".to_string(),
            translation_mentions_topic: "collector-mention".to_string(),
        }
    }

    #[test]
    fn test_classifies_export_archives() {
        assert_eq!(
            ArchiveKind::from_name("20250323151500.translation.export.CSV.zip"),
            Some(ArchiveKind::TranslationExport)
        );
    }

    #[test]
    fn test_classifies_mentions_archives() {
        assert_eq!(
            ArchiveKind::from_name("20250323151500.translation.mentions.CSV.zip"),
            Some(ArchiveKind::TranslationMentions)
        );
    }

    #[test]
    fn test_classifies_full_urls() {
        assert_eq!(
            ArchiveKind::from_name(
                "http://data.gdeltproject.org/gdeltv2/20250323151500.translation.export.CSV.zip"
            ),
            Some(ArchiveKind::TranslationExport)
        );
    }

    #[test]
    fn test_rejects_unsupported_archives() {
        assert_eq!(ArchiveKind::from_name("20250323151500.unsupported.zip"), None);
        // Untranslated feed files use the same suffix without "translation".
        assert_eq!(ArchiveKind::from_name("20250323151500.export.csv.zip"), None);
    }

    #[test]
    fn test_resolver_maps_kinds_to_topics() {
        let resolver = TopicResolver::new(&test_config());
        assert_eq!(
            resolver
                .resolve("20250323151500.translation.export.CSV.zip")
                .unwrap(),
            "collector-event"
        );
        assert_eq!(
            resolver
                .resolve("20250323151500.translation.mentions.CSV.zip")
                .unwrap(),
            "collector-mention"
        );
    }

    #[test]
    fn test_resolver_fails_unknown_archives() {
        let resolver = TopicResolver::new(&test_config());
        let err = resolver.resolve("something-else.zip").unwrap_err();
        assert!(matches!(err, CollectorError::UnknownArchiveType(_)));
    }
}
