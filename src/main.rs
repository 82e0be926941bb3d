use clap::Parser;
use photosearch::Opts;
use photosearch::cli::SubCommandExtend;
use photosearch::config::SubCommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(opts.log_filter().as_str()),
    )
    .init();

    match &opts.subcmd {
        SubCommand::IndexPhotos(config) => config.run(&opts).await,
        SubCommand::AddAspect(config) => config.run(&opts).await,
        SubCommand::SearchPhotos(config) => config.run(&opts).await,
        SubCommand::SearchPhotosByText(config) => config.run(&opts).await,
        SubCommand::ExamineImage(config) => config.run(&opts).await,
        SubCommand::ListModels(config) => config.run(&opts).await,
        SubCommand::ListPhotos(config) => config.run(&opts).await,
        SubCommand::RemovePhoto(config) => config.run(&opts).await,
        SubCommand::ClearStore(config) => config.run(&opts).await,
        SubCommand::DeleteStore(config) => config.run(&opts).await,
        SubCommand::Serve(config) => config.run(&opts).await,
    }
}
