#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Not a session profile: {0}")]
    NotASessionProfile(String),

    #[error("Credential issuer error: {0}")]
    CredentialIssuerError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    StdIoError(#[from] std::io::Error),

    #[error(transparent)]
    IniParseError(#[from] ini::ParseError),

    #[error(transparent)]
    PromptError(#[from] dialoguer::Error),
}

impl Error {
    pub(crate) fn issuer<E>(context: &str, e: E) -> Self
    where
        E: std::error::Error,
    {
        // SdkError displays only its kind; the STS message is in the source chain
        let mut message = format!("{context}: {e}");
        let mut source = e.source();
        while let Some(s) = source {
            message.push_str(&format!(": {s}"));
            source = s.source();
        }
        Self::CredentialIssuerError(message)
    }
}
