//! Configuration CLI commands.
//!
//! `config show` prints the effective configuration, `config default` a fully
//! commented default file and `config path` where the file is looked up.

use std::path::PathBuf;

use arsession::config::{config_file_path, ConfigFile, DEFAULT_CONFIG_TEMPLATE};
use clap::Subcommand;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Configuration file (defaults to the platform config directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print a commented configuration file with every default
    Default,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { config } => run_show(config),
        ConfigCommands::Default => {
            print!("{}", DEFAULT_CONFIG_TEMPLATE);
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

/// Load configuration from an explicit path or the default location.
pub fn load(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

fn run_show(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load(path.as_ref())?;
    match &path {
        Some(path) => println!("; {}", path.display()),
        None => println!("; {}", config_file_path().display()),
    }
    print!("{}", config.to_ini_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[marker]\nvalue = 9").unwrap();

        let config = load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(
            config.tracker.marker,
            arsession::collab::MarkerKind::Barcode { value: 9 }
        );
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ini");
        assert!(matches!(load(Some(&missing)), Err(CliError::Config(_))));
    }
}
