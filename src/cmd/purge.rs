#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    /// Remove every session profile, including ones that are still valid
    #[clap(long, short = 'f', action = clap::ArgAction::SetTrue)]
    pub force: bool,
}

#[tokio::main]
pub async fn run(config: &crate::config::Config, args: &PurgeArgs) -> Result<(), anyhow::Error> {
    let _span = tracing::info_span!("purge").entered();

    let manager = crate::session::SessionManager::without_issuer(config);
    let purged = manager.purge(args.force).await?;
    for name in purged.iter() {
        println!("[{name}] - purged");
    }
    tracing::info!(message = "Purge finished", purged = purged.len(), force = args.force);
    Ok(())
}
