use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts, OutputFormat};
use crate::model::{ModelClient, OllamaClient};

#[derive(Parser, Debug, Clone)]
pub struct ListModelsCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SubCommandExtend for ListModelsCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let client = OllamaClient::from_options(&self.model)?;
        let models = client.list_models().await?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&models)?),
            OutputFormat::Table => {
                for model in &models {
                    println!("{}\t{}\t{}", model.name, model.size, model.modified_at);
                }
            }
        }
        Ok(())
    }
}
