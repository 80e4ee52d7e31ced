#[derive(clap::Parser, Debug)]
#[clap(name = "aws-session", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the AWS config file [default: $AWS_CONFIG_FILE or ~/.aws/config]
    #[clap(long, global = true, value_parser)]
    pub config_file: Option<std::path::PathBuf>,
    /// Path to the AWS credentials file [default: $AWS_SHARED_CREDENTIALS_FILE or ~/.aws/credentials]
    #[clap(long, global = true, value_parser)]
    pub credentials_file: Option<std::path::PathBuf>,
    /// AWS region to use for STS; overrides the profile's region
    #[clap(long, global = true)]
    pub region: Option<String>,
    /// Increase verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[clap(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Get session credentials for a profile and store them as NAME--session
    Get(crate::cmd::get::GetArgs),
    /// List profiles
    List(crate::cmd::list::ListArgs),
    /// Remove expired session profiles from the credentials file
    Purge(crate::cmd::purge::PurgeArgs),
}

impl Cli {
    pub fn config(&self) -> Result<crate::config::Config, crate::error::Error> {
        crate::config::Config::new(
            self.config_file.clone(),
            self.credentials_file.clone(),
            crate::config::ConfigData {
                region: self.region.clone(),
                ..Default::default()
            },
        )
    }

    pub fn run(&self) -> Result<(), anyhow::Error> {
        let config = self.config()?;
        tracing::debug!(config = ?config);

        match self.command {
            Commands::Get(ref args) => crate::cmd::get::run(&config, args),
            Commands::List(ref args) => crate::cmd::list::run(&config, args),
            Commands::Purge(ref args) => crate::cmd::purge::run(&config, args),
        }
    }
}
