use crate::config::FilterConfig;
use crate::constants::FOREIGN_CATEGORY;
use crate::models::Release;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Resolution {
        wanted: String,
        found: Option<String>,
    },
    Source {
        wanted: String,
        found: Option<String>,
    },
    Foreign,
    Pack,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { wanted, found } => write!(
                f,
                "resolution {} does not match {wanted}",
                found.as_deref().unwrap_or("unknown")
            ),
            Self::Source { wanted, found } => write!(
                f,
                "source {} does not match {wanted}",
                found.as_deref().unwrap_or("unknown")
            ),
            Self::Foreign => write!(f, "foreign release"),
            Self::Pack => write!(f, "season pack"),
        }
    }
}

/// Resolution, source, language and pack policy.
#[derive(Debug, Clone)]
pub struct QualityFilter {
    resolution: String,
    source: String,
    skip_foreign: bool,
    skip_packs: bool,
}

impl QualityFilter {
    #[must_use]
    pub fn new(resolution: &str, source: &str, skip_foreign: bool, skip_packs: bool) -> Self {
        Self {
            resolution: resolution.trim().to_string(),
            source: source.trim().to_string(),
            skip_foreign,
            skip_packs,
        }
    }

    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            &config.resolution,
            &config.source,
            config.skip_foreign,
            config.skip_packs,
        )
    }

    /// # Errors
    /// Returns the first policy the release violates.
    pub fn check(&self, release: &Release) -> Result<(), Rejection> {
        if release.resolution.as_deref() != Some(self.resolution.as_str()) {
            return Err(Rejection::Resolution {
                wanted: self.resolution.clone(),
                found: release.resolution.clone(),
            });
        }

        if !self.source.is_empty()
            && !release
                .source
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(&self.source))
        {
            return Err(Rejection::Source {
                wanted: self.source.clone(),
                found: release.source.clone(),
            });
        }

        if self.skip_foreign && release.categories.contains(FOREIGN_CATEGORY) {
            return Err(Rejection::Foreign);
        }

        if self.skip_packs && release.is_pack() {
            return Err(Rejection::Pack);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{release, release_in};

    #[test]
    fn test_accepts_matching_release() {
        let filter = QualityFilter::new("1080p", "WEB", true, true);
        assert!(filter.check(&release("Show.A.S02E05.1080p.WEB.h264-GRP")).is_ok());
    }

    #[test]
    fn test_resolution_must_match_exactly() {
        let filter = QualityFilter::new("1080p", "", true, true);
        assert!(matches!(
            filter.check(&release("Show.A.S02E05.720p.WEB")),
            Err(Rejection::Resolution { .. })
        ));
        assert!(matches!(
            filter.check(&release("Show.A.S02E05.WEB")),
            Err(Rejection::Resolution { found: None, .. })
        ));
    }

    #[test]
    fn test_empty_source_accepts_any() {
        let filter = QualityFilter::new("1080p", "", true, true);
        assert!(filter.check(&release("Show.A.S02E05.1080p.HDTV")).is_ok());
        assert!(filter.check(&release("Show.A.S02E05.1080p")).is_ok());
    }

    #[test]
    fn test_source_mismatch() {
        let filter = QualityFilter::new("1080p", "bluray", true, true);
        assert!(matches!(
            filter.check(&release("Show.A.S02E05.1080p.WEB")),
            Err(Rejection::Source { .. })
        ));
    }

    #[test]
    fn test_foreign_category() {
        let foreign = release_in("Show.A.S02E05.1080p.WEB", &["TV", "Foreign"]);
        assert_eq!(
            QualityFilter::new("1080p", "", true, true).check(&foreign),
            Err(Rejection::Foreign)
        );
        assert!(QualityFilter::new("1080p", "", false, true).check(&foreign).is_ok());
    }

    #[test]
    fn test_packs_skipped() {
        let pack = release("Show.C.S03.1080p.BluRay.x264-GRP");
        assert_eq!(
            QualityFilter::new("1080p", "", true, true).check(&pack),
            Err(Rejection::Pack)
        );
        assert!(QualityFilter::new("1080p", "", true, false).check(&pack).is_ok());
    }
}
