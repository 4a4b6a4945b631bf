use anyhow::Result;
use clap::{Args, Subcommand};

use wirehub_cli::LoadedConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file location
    Path,
}

pub fn cmd_config(args: ConfigArgs, loaded: &LoadedConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            if loaded.from_file {
                println!("Current configuration ({}):", loaded.path.display());
            } else {
                println!(
                    "Current configuration (defaults; no file at {}):",
                    loaded.path.display()
                );
            }
            println!("{}", serde_yaml::to_string(&loaded.config)?);
        }
        ConfigAction::Path => println!("{}", loaded.path.display()),
    }
    Ok(())
}
