//! Profiles read from the shared config and credentials files.

/// Ordered key/value settings of a single profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    inner: SettingsInner,
}

type SettingsInner = Vec<(String, String)>;

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value in place when the key exists, appends otherwise.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.inner.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.inner.iter().position(|(k, _)| k == key)?;
        Some(self.inner.remove(idx).1)
    }

    pub fn into_inner(self) -> SettingsInner {
        self.inner
    }
}

impl std::ops::Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut settings = Self::new();
        for (k, v) in iter {
            settings.set(k, v);
        }
        settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub settings: Settings,
}

impl Profile {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key)
    }
}

/// All profiles known from the config file and the credentials file.
#[derive(Debug, Clone, Default)]
pub struct Profiles {
    inner: std::collections::BTreeMap<String, Settings>,
}

const CONFIG_PROFILE_PREFIX: &str = "profile ";
const DEFAULT_PROFILE: &str = "default";

impl Profiles {
    pub async fn load(config: &crate::config::Config) -> Result<Self, crate::error::Error> {
        let mut profiles = Self::default();
        if let Some(source) = read_optional(config.config_file()).await? {
            profiles.merge_config(&parse(&source)?);
        }
        if let Some(source) = read_optional(config.credentials_file()).await? {
            profiles.merge_credentials(&parse(&source)?);
        }
        tracing::debug!(
            message = "Loaded profiles",
            config_file = ?config.config_file(),
            credentials_file = ?config.credentials_file(),
            count = profiles.inner.len()
        );
        Ok(profiles)
    }

    /// `[default]` and `[profile NAME]` are profiles in the config file; other sections are not.
    fn merge_config(&mut self, ini: &ini::Ini) {
        for (section, props) in ini.iter() {
            let name = match section {
                Some(DEFAULT_PROFILE) => DEFAULT_PROFILE,
                Some(s) => match s.strip_prefix(CONFIG_PROFILE_PREFIX) {
                    Some(n) => n.trim(),
                    None => continue,
                },
                None => continue,
            };
            self.merge(name, props);
        }
    }

    fn merge_credentials(&mut self, ini: &ini::Ini) {
        for (section, props) in ini.iter() {
            if let Some(name) = section {
                self.merge(name, props);
            }
        }
    }

    fn merge(&mut self, name: &str, props: &ini::Properties) {
        let settings = self.inner.entry(name.to_owned()).or_default();
        for (k, v) in props.iter() {
            settings.set(k, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<Profile> {
        self.inner.get(name).map(|settings| Profile {
            name: name.to_owned(),
            settings: settings.clone(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Profile names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(|k| k.as_str())
    }
}

/// Values are taken verbatim; AWS tooling does not unquote or unescape them.
fn parse(source: &str) -> Result<ini::Ini, ini::ParseError> {
    ini::Ini::load_from_str_opt(
        source,
        ini::ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        },
    )
}

async fn read_optional(path: &std::path::Path) -> Result<Option<String>, crate::error::Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_settings_set_keeps_order() {
        let mut s = Settings::from_iter([("region", "eu-west-1"), ("output", "json")]);
        s.set("region", "us-east-1");
        s.set("role_arn", "arn:aws:iam::123456789012:role/admin");
        assert_eq!(
            s.into_inner(),
            vec![
                ("region".to_string(), "us-east-1".to_string()),
                ("output".to_string(), "json".to_string()),
                (
                    "role_arn".to_string(),
                    "arn:aws:iam::123456789012:role/admin".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_settings_remove() {
        let mut s = Settings::from_iter([("a", "1"), ("b", "2")]);
        assert_eq!(s.remove("a").as_deref(), Some("1"));
        assert_eq!(s.remove("a"), None);
        assert_eq!(s.get("b"), Some("2"));
        assert_eq!(s.len(), 1);
    }

    #[tokio::test]
    async fn test_load() {
        let config = crate::dev::TestConfig::new();
        config.write_config(indoc::indoc! {"
            [default]
            region = ap-northeast-1

            [profile dev]
            role_arn = arn:aws:iam::123456789012:role/dev
            source_profile = default
            region = eu-west-1

            [sso-session corp]
            sso_region = us-east-1
        "});
        config.write_credentials(indoc::indoc! {"
            [default]
            aws_access_key_id = AKIAEXAMPLE
            aws_secret_access_key = secret
            region = us-west-2

            [dev--session]
            aws_access_key_id = ASIAEXAMPLE
        "});

        let profiles = Profiles::load(&config).await.unwrap();
        assert_eq!(
            profiles.names().collect::<Vec<_>>(),
            vec!["default", "dev", "dev--session"]
        );
        assert!(!profiles.contains("corp"));
        assert!(!profiles.contains("sso-session corp"));

        let default = profiles.get("default").unwrap();
        assert_eq!(default.get("region"), Some("us-west-2"));
        assert_eq!(default.get("aws_access_key_id"), Some("AKIAEXAMPLE"));
        assert_eq!(default.settings[0].0, "region");

        let dev = profiles.get("dev").unwrap();
        assert_eq!(dev.get("role_arn"), Some("arn:aws:iam::123456789012:role/dev"));
        assert_eq!(dev.get("region"), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn test_load_missing_files() {
        let config = crate::dev::TestConfig::new();
        let profiles = Profiles::load(&config).await.unwrap();
        assert_eq!(profiles.names().count(), 0);
        assert!(profiles.get("default").is_none());
    }
}
