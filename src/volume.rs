use crate::config::Config;
use crate::storage::{Settings, MAX_VOLUME};

/// Cookie the site's video player reads its initial volume from, e.g.
/// `video_v=0.1; domain=.dcinside.com; path=/`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeCookie {
    pub name: String,
    pub value: f64,
    pub domain: String,
}

impl VolumeCookie {
    pub fn from_settings(config: &Config, settings: &Settings) -> Self {
        Self {
            name: config.volume.cookie_name.clone(),
            value: f64::from(settings.volume.min(MAX_VOLUME)) / 100.0,
            domain: config.site.domain.clone(),
        }
    }

    /// The `name=value` pair alone, as sent in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl std::fmt::Display for VolumeCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}; domain={}; path=/", self.pair(), self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_becomes_fraction() {
        let cookie = VolumeCookie::from_settings(
            &Config::default(),
            &Settings {
                filter_enabled: true,
                volume: 10,
            },
        );
        assert_eq!(cookie.to_string(), "video_v=0.1; domain=.dcinside.com; path=/");
    }

    #[test]
    fn bounds_are_exact() {
        let config = Config::default();
        let silent = VolumeCookie::from_settings(
            &config,
            &Settings {
                filter_enabled: false,
                volume: 0,
            },
        );
        assert_eq!(silent.pair(), "video_v=0");
        let full = VolumeCookie::from_settings(
            &config,
            &Settings {
                filter_enabled: false,
                volume: 100,
            },
        );
        assert_eq!(full.pair(), "video_v=1");
    }
}
