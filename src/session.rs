//! Session profiles: expiry checks, refresh and purge.

pub const SESSION_SUFFIX: &str = "--session";

pub const KEY_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const KEY_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const KEY_SESSION_TOKEN: &str = "aws_session_token";
pub const KEY_SESSION_EXPIRY_TIME: &str = "aws_session_expiry_time";

/// Stored in local time, without offset
const EXPIRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keys never carried over from a source profile into its session profile
pub const STRIPPED_KEYS: &[&str] = &[
    "role_arn",
    "source_profile",
    "credential_source",
    "role_session_name",
    "external_id",
    "mfa_serial",
    "duration_seconds",
    "session_duration_seconds",
    "web_identity_token_file",
    "credential_process",
    "sso_session",
    "sso_start_url",
    "sso_region",
    "sso_account_id",
    "sso_role_name",
];

pub fn session_profile_name(source: &str) -> String {
    format!("{source}{SESSION_SUFFIX}")
}

/// `dev--session` and `dev` both name the source profile `dev`
pub fn source_profile_name(name: &str) -> &str {
    name.strip_suffix(SESSION_SUFFIX).unwrap_or(name)
}

pub fn is_session_profile_name(name: &str) -> bool {
    name.len() > SESSION_SUFFIX.len() && name.ends_with(SESSION_SUFFIX)
}

/// Stored expiry of a session profile. Missing or unparsable values count as `now`.
pub fn session_expiry(
    profile: Option<&crate::profile::Profile>,
    name: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<chrono::DateTime<chrono::Utc>, crate::error::Error> {
    if !is_session_profile_name(name) {
        return Err(crate::error::Error::NotASessionProfile(name.to_owned()));
    }
    let value = match profile.and_then(|p| p.get(KEY_SESSION_EXPIRY_TIME)) {
        Some(v) => v,
        None => return Ok(now),
    };
    match parse_expiry(value) {
        Some(v) => Ok(v),
        None => {
            tracing::warn!(message = "Ignoring unparsable session expiry", profile = %name, value = %value);
            Ok(now)
        }
    }
}

fn parse_expiry(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let naive = chrono::NaiveDateTime::parse_from_str(value.trim(), EXPIRY_TIME_FORMAT).ok()?;
    naive
        .and_local_timezone(chrono::Local)
        .earliest()
        .map(|v| v.with_timezone(&chrono::Utc))
}

pub fn format_expiry(expiry: &chrono::DateTime<chrono::Utc>) -> String {
    expiry
        .with_timezone(&chrono::Local)
        .format(EXPIRY_TIME_FORMAT)
        .to_string()
}

pub fn needs_refresh(
    expiry: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
    threshold: chrono::Duration,
    force: bool,
) -> bool {
    force || expiry - now < threshold
}

/// Builds session profile settings from a source profile.
///
/// Credentials are set last so they win over anything copied from the source, and are moved to
/// the front of the section.
pub struct SessionSettingsBuilder {
    settings: crate::profile::Settings,
}

impl SessionSettingsBuilder {
    pub fn from_source(source: &crate::profile::Settings) -> Self {
        Self {
            settings: source.clone(),
        }
    }

    pub fn strip(mut self, keys: &[&str]) -> Self {
        for key in keys {
            self.settings.remove(key);
        }
        self
    }

    pub fn credentials(mut self, credentials: &crate::issuer::SessionCredentials) -> Self {
        use secrecy::ExposeSecret;

        let resolved = [
            (KEY_ACCESS_KEY_ID, credentials.access_key_id.clone()),
            (
                KEY_SECRET_ACCESS_KEY,
                credentials.secret_access_key.expose_secret().clone(),
            ),
            (KEY_SESSION_TOKEN, credentials.session_token.clone()),
            (KEY_SESSION_EXPIRY_TIME, format_expiry(&credentials.expiration)),
        ];
        let mut settings: crate::profile::Settings =
            resolved.iter().map(|(k, v)| (*k, v.clone())).collect();
        for (k, v) in self.settings.iter() {
            if settings.get(k).is_none() {
                settings.set(k.as_str(), v.as_str());
            }
        }
        self.settings = settings;
        self
    }

    pub fn build(self) -> crate::profile::Settings {
        self.settings
    }
}

pub struct SessionManager<'a, I> {
    config: &'a crate::config::Config,
    issuer: I,
}

impl<'a> SessionManager<'a, ()> {
    /// `list` and `purge` never issue credentials
    pub fn without_issuer(config: &'a crate::config::Config) -> Self {
        Self { config, issuer: () }
    }
}

impl<'a, I> SessionManager<'a, I> {
    pub fn new(config: &'a crate::config::Config, issuer: I) -> Self {
        Self { config, issuer }
    }

    /// All profile names, sorted
    pub async fn list(&self) -> Result<Vec<String>, crate::error::Error> {
        let profiles = crate::profile::Profiles::load(self.config).await?;
        Ok(profiles.names().map(|v| v.to_owned()).collect())
    }

    /// Remove expired session profiles, or all of them with `force_all`.
    ///
    /// Returns the removed profile names.
    pub async fn purge(&self, force_all: bool) -> Result<Vec<String>, crate::error::Error> {
        let profiles = crate::profile::Profiles::load(self.config).await?;
        let now = chrono::Utc::now();
        let mut purged = Vec::new();

        for name in profiles.names().filter(|n| is_session_profile_name(n)) {
            let expiry = session_expiry(profiles.get(name).as_ref(), name, now)?;
            if !needs_refresh(expiry, now, self.config.expiration_threshold, force_all) {
                tracing::debug!(message = "Keeping session profile", profile = %name, expiry = %expiry);
                continue;
            }
            if crate::section::delete_section(self.config.credentials_file(), name).await? {
                tracing::info!(message = "Purged session profile", profile = %name, expiry = %expiry);
                purged.push(name.to_owned());
            }
        }

        Ok(purged)
    }
}

impl<'a, I: crate::issuer::CredentialIssuer> SessionManager<'a, I> {
    /// Refresh the session profile of `profile_name` when it is close to expiry or `force_new`.
    ///
    /// Returns the session profile name and its expiry.
    pub async fn get(
        &self,
        profile_name: &str,
        force_new: bool,
    ) -> Result<(String, chrono::DateTime<chrono::Utc>), crate::error::Error> {
        use chrono::SubsecRound;

        let source_name = source_profile_name(profile_name);
        let profiles = crate::profile::Profiles::load(self.config).await?;
        let source = profiles
            .get(source_name)
            .ok_or_else(|| crate::error::Error::ProfileNotFound(source_name.to_owned()))?;

        let session_name = session_profile_name(source_name);
        let now = chrono::Utc::now();
        let expiry = session_expiry(profiles.get(&session_name).as_ref(), &session_name, now)?;

        if !needs_refresh(expiry, now, self.config.expiration_threshold, force_new) {
            tracing::info!(message = "Session is still valid; not refreshing", profile = %session_name, expiry = %expiry);
            return Ok((session_name, expiry));
        }

        tracing::info!(message = "Refreshing session", profile = %session_name, expiry = %expiry, force = force_new);
        let credentials = self.issuer.issue(&source).await?;
        let settings = SessionSettingsBuilder::from_source(&source.settings)
            .strip(STRIPPED_KEYS)
            .credentials(&credentials)
            .build();

        crate::section::replace_section(self.config.credentials_file(), &session_name, &settings)
            .await?;
        // Same whole-second precision as the stored value
        let expiry = credentials.expiration.trunc_subsecs(0);
        tracing::info!(message = "Saved session credentials", profile = %session_name, credentials_file = ?self.config.credentials_file(), expiry = %expiry);

        Ok((session_name, expiry))
    }
}

/// Largest non-zero unit of a remaining duration, e.g. `11 hours`
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let total_seconds = remaining.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = total_seconds / 60;
    if hours != 0 {
        format!("{hours} hours")
    } else if minutes != 0 {
        format!("{minutes} minutes")
    } else {
        format!("{total_seconds} seconds")
    }
}
