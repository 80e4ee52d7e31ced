#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Profile to get session credentials for
    ///
    /// Defaults to $AWS_PROFILE, $AWS_DEFAULT_PROFILE, then `default`.
    /// A session profile name (`NAME--session`) is accepted and means `NAME`.
    #[clap(long, short = 'p')]
    pub profile: Option<String>,
    /// Force a new session even if the current one is still valid
    #[clap(long, short = 'f', action = clap::ArgAction::SetTrue)]
    pub force: bool,
}

fn default_profile() -> String {
    for name in ["AWS_PROFILE", "AWS_DEFAULT_PROFILE"] {
        if let Ok(v) = std::env::var(name) {
            if !v.is_empty() {
                return v;
            }
        }
    }
    "default".to_string()
}

#[tokio::main]
pub async fn run(config: &crate::config::Config, args: &GetArgs) -> Result<(), anyhow::Error> {
    let _span = tracing::info_span!("get").entered();

    let profile = match args.profile {
        Some(ref v) => v.clone(),
        None => default_profile(),
    };
    tracing::debug!(profile = %profile, force = args.force);

    let issuer = crate::issuer::StsIssuer::new(config);
    let manager = crate::session::SessionManager::new(config, issuer);
    let (session_profile, expiry) = manager.get(&profile, args.force).await?;

    let remaining = expiry - chrono::Utc::now();
    println!(
        "[{session_profile}] - Session is valid for {}, until {}",
        crate::session::format_remaining(remaining),
        expiry.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_profile() {
        let original_profile = std::env::var("AWS_PROFILE").ok();
        let original_default = std::env::var("AWS_DEFAULT_PROFILE").ok();

        std::env::remove_var("AWS_PROFILE");
        std::env::remove_var("AWS_DEFAULT_PROFILE");
        assert_eq!(default_profile(), "default");

        std::env::set_var("AWS_DEFAULT_PROFILE", "fallback");
        assert_eq!(default_profile(), "fallback");

        std::env::set_var("AWS_PROFILE", "primary");
        assert_eq!(default_profile(), "primary");

        match original_profile {
            Some(v) => std::env::set_var("AWS_PROFILE", v),
            None => std::env::remove_var("AWS_PROFILE"),
        }
        match original_default {
            Some(v) => std::env::set_var("AWS_DEFAULT_PROFILE", v),
            None => std::env::remove_var("AWS_DEFAULT_PROFILE"),
        }
    }
}
