#[derive(clap::Args, Debug)]
pub struct ListArgs {}

#[tokio::main]
pub async fn run(config: &crate::config::Config, _args: &ListArgs) -> Result<(), anyhow::Error> {
    let _span = tracing::info_span!("list").entered();

    let manager = crate::session::SessionManager::without_issuer(config);
    for name in manager.list().await? {
        println!("{name}");
    }
    Ok(())
}
