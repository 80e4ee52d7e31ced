//! Obtain temporary credentials for a source profile from AWS STS.

/// Time-boxed credentials ready to be written to a session profile
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: String,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

impl SessionCredentials {
    fn from_sts(
        credentials: Option<&aws_sdk_sts::types::Credentials>,
    ) -> Result<Self, crate::error::Error> {
        let c = credentials.ok_or_else(|| {
            crate::error::Error::CredentialIssuerError("STS returned no credentials".to_string())
        })?;
        let exp = c.expiration();
        let expiration = chrono::DateTime::<chrono::Utc>::from_timestamp(exp.secs(), exp.subsec_nanos())
            .ok_or_else(|| {
                crate::error::Error::CredentialIssuerError(format!(
                    "STS returned an out of range expiration: {exp:?}"
                ))
            })?;
        Ok(Self {
            access_key_id: c.access_key_id().to_owned(),
            secret_access_key: secrecy::SecretString::new(c.secret_access_key().to_owned()),
            session_token: c.session_token().to_owned(),
            expiration,
        })
    }
}

/// Outcome of forcing a profile's credential provider once
#[derive(Debug)]
pub enum Resolution {
    /// The provider already vends temporary credentials (assume-role, web identity, SSO,
    /// credential_process)
    AlreadyResolved(SessionCredentials),
    /// Long-term user credentials that need a GetSessionToken exchange
    RequiresTokenExchange(aws_credential_types::Credentials),
}

impl Resolution {
    pub fn classify(credentials: aws_credential_types::Credentials) -> Self {
        match (credentials.session_token(), credentials.expiry()) {
            (Some(token), Some(expiry)) => Self::AlreadyResolved(SessionCredentials {
                access_key_id: credentials.access_key_id().to_owned(),
                secret_access_key: secrecy::SecretString::new(
                    credentials.secret_access_key().to_owned(),
                ),
                session_token: token.to_owned(),
                expiration: chrono::DateTime::<chrono::Utc>::from(expiry),
            }),
            _ => Self::RequiresTokenExchange(credentials),
        }
    }
}

#[async_trait::async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(
        &self,
        profile: &crate::profile::Profile,
    ) -> Result<SessionCredentials, crate::error::Error>;
}

pub trait ProvideMfaToken: Send + Sync {
    fn mfa_token(&self, mfa_serial: &str) -> Result<String, crate::error::Error>;
}

/// Prompts on the terminal without echo
#[derive(Debug, Default)]
pub struct TerminalMfaPrompt;

impl ProvideMfaToken for TerminalMfaPrompt {
    fn mfa_token(&self, mfa_serial: &str) -> Result<String, crate::error::Error> {
        let code = dialoguer::Password::new()
            .with_prompt(format!("Enter MFA code for {mfa_serial}"))
            .interact()?;
        Ok(code.trim().to_owned())
    }
}

const DEFAULT_STS_REGION: &str = "us-east-1";
const DEFAULT_SESSION_TOKEN_DURATION_SECONDS: i32 = 12 * 60 * 60;
const DEFAULT_ASSUME_ROLE_DURATION_SECONDS: i32 = 60 * 60;

const KEY_ROLE_ARN: &str = "role_arn";
const KEY_SOURCE_PROFILE: &str = "source_profile";
const KEY_MFA_SERIAL: &str = "mfa_serial";
const KEY_EXTERNAL_ID: &str = "external_id";
const KEY_ROLE_SESSION_NAME: &str = "role_session_name";
const KEY_DURATION_SECONDS: &str = "duration_seconds";
const KEY_SESSION_DURATION_SECONDS: &str = "session_duration_seconds";
const KEY_REGION: &str = "region";

#[derive(Debug, PartialEq, Eq)]
enum Plan<'a> {
    /// The SDK's assume-role provider cannot ask for an MFA code, so call AssumeRole directly
    AssumeRoleWithMfa {
        role_arn: &'a str,
        source_profile: &'a str,
        mfa_serial: &'a str,
    },
    ProviderChain,
}

impl<'a> Plan<'a> {
    fn for_profile(profile: &'a crate::profile::Profile) -> Self {
        match (
            profile.get(KEY_ROLE_ARN),
            profile.get(KEY_SOURCE_PROFILE),
            profile.get(KEY_MFA_SERIAL),
        ) {
            (Some(role_arn), Some(source_profile), Some(mfa_serial)) => Self::AssumeRoleWithMfa {
                role_arn,
                source_profile,
                mfa_serial,
            },
            _ => Self::ProviderChain,
        }
    }
}

fn duration_seconds(
    profile: &crate::profile::Profile,
    keys: &[&str],
    default: i32,
) -> Result<i32, crate::error::Error> {
    for key in keys {
        if let Some(v) = profile.get(key) {
            return v.trim().parse::<i32>().map_err(|_| {
                crate::error::Error::ConfigError(format!(
                    "[{}] {key} must be an integer, got {v:?}",
                    profile.name
                ))
            });
        }
    }
    Ok(default)
}

/// Issues credentials through STS using the shared config and credentials files
pub struct StsIssuer<M = TerminalMfaPrompt> {
    config_file: std::path::PathBuf,
    credentials_file: std::path::PathBuf,
    region: Option<String>,
    mfa: M,
}

impl StsIssuer<TerminalMfaPrompt> {
    pub fn new(config: &crate::config::Config) -> Self {
        Self::with_mfa_provider(config, TerminalMfaPrompt)
    }
}

impl<M: ProvideMfaToken> StsIssuer<M> {
    pub fn with_mfa_provider(config: &crate::config::Config, mfa: M) -> Self {
        Self {
            config_file: config.config_file().to_owned(),
            credentials_file: config.credentials_file().to_owned(),
            region: config.region.clone(),
            mfa,
        }
    }

    async fn sdk_config(
        &self,
        profile_name: &str,
        region: Option<&str>,
    ) -> aws_config::SdkConfig {
        use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};

        let files = ProfileFiles::builder()
            .with_file(ProfileFileKind::Config, &self.config_file)
            .with_file(ProfileFileKind::Credentials, &self.credentials_file)
            .build();

        let region = self
            .region
            .as_deref()
            .or(region)
            .map(|r| aws_config::Region::new(r.to_owned()));

        // Credentials come from the named profile only, never from AWS_ACCESS_KEY_ID and friends
        let provider = aws_config::profile::ProfileFileCredentialsProvider::builder()
            .configure(
                &aws_config::provider_config::ProviderConfig::default().with_region(region.clone()),
            )
            .profile_files(files.clone())
            .profile_name(profile_name)
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .profile_files(files)
            .profile_name(profile_name)
            .credentials_provider(provider);
        if let Some(r) = region {
            loader = loader.region(r);
        }
        loader.load().await
    }

    fn sts_client(sdk_config: &aws_config::SdkConfig) -> aws_sdk_sts::Client {
        let mut builder = aws_sdk_sts::config::Builder::from(sdk_config);
        if sdk_config.region().is_none() {
            tracing::debug!(
                message = "No region configured, using default for STS",
                region = DEFAULT_STS_REGION
            );
            builder = builder.region(aws_config::Region::new(DEFAULT_STS_REGION));
        }
        aws_sdk_sts::Client::from_conf(builder.build())
    }

    /// Force the profile's (possibly lazy) provider once.
    async fn resolve(
        &self,
        sdk_config: &aws_config::SdkConfig,
        profile_name: &str,
    ) -> Result<aws_credential_types::Credentials, crate::error::Error> {
        use aws_credential_types::provider::ProvideCredentials;

        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            crate::error::Error::CredentialIssuerError(format!(
                "no credentials provider for profile {profile_name}"
            ))
        })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| crate::error::Error::issuer("Failed to resolve credentials", e))
    }

    async fn get_session_token(
        &self,
        profile: &crate::profile::Profile,
        sdk_config: &aws_config::SdkConfig,
    ) -> Result<SessionCredentials, crate::error::Error> {
        let duration = duration_seconds(
            profile,
            &[KEY_DURATION_SECONDS, KEY_SESSION_DURATION_SECONDS],
            DEFAULT_SESSION_TOKEN_DURATION_SECONDS,
        )?;
        let mfa_serial = profile.get(KEY_MFA_SERIAL);
        let token_code = match mfa_serial {
            Some(serial) => Some(self.mfa.mfa_token(serial)?),
            None => None,
        };

        tracing::info!(message = "Calling STS GetSessionToken", profile = %profile.name, duration_seconds = duration, mfa_serial = ?mfa_serial);
        let output = Self::sts_client(sdk_config)
            .get_session_token()
            .duration_seconds(duration)
            .set_serial_number(mfa_serial.map(|v| v.to_owned()))
            .set_token_code(token_code)
            .send()
            .await
            .map_err(|e| crate::error::Error::issuer("GetSessionToken failed", e))?;

        SessionCredentials::from_sts(output.credentials())
    }

    async fn assume_role_with_mfa(
        &self,
        profile: &crate::profile::Profile,
        role_arn: &str,
        source_profile: &str,
        mfa_serial: &str,
    ) -> Result<SessionCredentials, crate::error::Error> {
        let duration = duration_seconds(
            profile,
            &[KEY_DURATION_SECONDS],
            DEFAULT_ASSUME_ROLE_DURATION_SECONDS,
        )?;
        let session_name = match profile.get(KEY_ROLE_SESSION_NAME) {
            Some(v) => v.to_owned(),
            None => format!("aws-session-{}", chrono::Utc::now().timestamp()),
        };

        let sdk_config = self
            .sdk_config(source_profile, profile.get(KEY_REGION))
            .await;
        let token_code = self.mfa.mfa_token(mfa_serial)?;

        tracing::info!(message = "Calling STS AssumeRole", profile = %profile.name, source_profile = %source_profile, role_arn = %role_arn, duration_seconds = duration, mfa_serial = %mfa_serial);
        let output = Self::sts_client(&sdk_config)
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .serial_number(mfa_serial)
            .token_code(token_code)
            .set_external_id(profile.get(KEY_EXTERNAL_ID).map(|v| v.to_owned()))
            .duration_seconds(duration)
            .send()
            .await
            .map_err(|e| crate::error::Error::issuer("AssumeRole failed", e))?;

        SessionCredentials::from_sts(output.credentials())
    }
}

#[async_trait::async_trait]
impl<M: ProvideMfaToken> CredentialIssuer for StsIssuer<M> {
    async fn issue(
        &self,
        profile: &crate::profile::Profile,
    ) -> Result<SessionCredentials, crate::error::Error> {
        let credentials = match Plan::for_profile(profile) {
            Plan::AssumeRoleWithMfa {
                role_arn,
                source_profile,
                mfa_serial,
            } => {
                self.assume_role_with_mfa(profile, role_arn, source_profile, mfa_serial)
                    .await?
            }
            Plan::ProviderChain => {
                let sdk_config = self.sdk_config(&profile.name, profile.get(KEY_REGION)).await;
                match Resolution::classify(self.resolve(&sdk_config, &profile.name).await?) {
                    Resolution::AlreadyResolved(c) => {
                        tracing::debug!(message = "Provider vended temporary credentials", profile = %profile.name);
                        c
                    }
                    Resolution::RequiresTokenExchange(_) => {
                        self.get_session_token(profile, &sdk_config).await?
                    }
                }
            }
        };

        tracing::info!(message = "Obtained session credentials", profile = %profile.name, access_key_id = %credentials.access_key_id, expiration = %credentials.expiration);
        Ok(credentials)
    }
}
