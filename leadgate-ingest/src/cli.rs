//! Command-line arguments
//!
//! Every setting may also come from its environment variable. Anything left
//! unset falls through to the TOML config file, then to the compiled default.

use clap::Parser;
use leadgate_common::config::{load_config_file, ConfigLayer, LeadConfig};
use std::path::PathBuf;

/// Command-line arguments for leadgate-ingest
#[derive(Parser, Debug, Default)]
#[command(name = "leadgate-ingest")]
#[command(about = "Lead validation and ingestion service")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(short, long, env = "LEADGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "LEADGATE_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Lead store table identifier
    #[arg(long, env = "LEADS_TABLE_NAME")]
    pub leads_table_name: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Lead store database URL
    #[arg(long, env = "LEADS_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "IPQS_API_KEY", hide_env_values = true)]
    pub ipqs_api_key: Option<String>,

    #[arg(long, env = "IPQS_BASE_URL")]
    pub ipqs_base_url: Option<String>,

    #[arg(long, env = "TRUSTEDFORM_USERNAME")]
    pub trustedform_username: Option<String>,

    #[arg(long, env = "TRUSTEDFORM_PASSWORD", hide_env_values = true)]
    pub trustedform_password: Option<String>,

    #[arg(long, env = "TRUSTEDFORM_BASE_URL")]
    pub trustedform_base_url: Option<String>,
}

impl Args {
    /// Settings supplied on the command line or through the environment
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            leads_table_name: self.leads_table_name.clone(),
            region: self.region.clone(),
            database_url: self.database_url.clone(),
            ipqs_api_key: self.ipqs_api_key.clone(),
            ipqs_base_url: self.ipqs_base_url.clone(),
            trustedform_username: self.trustedform_username.clone(),
            trustedform_password: self.trustedform_password.clone(),
            trustedform_base_url: self.trustedform_base_url.clone(),
            listen_addr: self.listen_addr.clone(),
        }
    }

    /// Merge these arguments with the config file, if one was given
    pub fn resolve(&self) -> leadgate_common::Result<LeadConfig> {
        let file = self.config.as_deref().map(load_config_file).transpose()?;
        LeadConfig::resolve(self.layer(), file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgate_common::config::DEFAULT_REGION;
    use serial_test::serial;
    use std::io::Write;

    const VARS: [&str; 4] = [
        "LEADS_TABLE_NAME",
        "AWS_REGION",
        "LEADGATE_CONFIG",
        "IPQS_API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_env_fills_unset_arguments() {
        clear_env();
        std::env::set_var("LEADS_TABLE_NAME", "staging_leads");
        std::env::set_var("IPQS_API_KEY", "from-env");

        let argv = ["leadgate-ingest", "--leads-table-name", "cli_leads"];
        let args = Args::try_parse_from(argv).unwrap();
        let config = args.resolve().unwrap();

        // Command line beats environment
        assert_eq!(config.leads_table_name, "cli_leads");
        assert_eq!(config.ipqs_api_key, "from-env");
        assert_eq!(config.region, DEFAULT_REGION);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_file_below_environment() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let contents = "region = \"eu-west-1\"\nleads_table_name = \"file_leads\"";
        writeln!(file, "{}", contents).unwrap();

        std::env::set_var("LEADGATE_CONFIG", file.path());
        std::env::set_var("LEADS_TABLE_NAME", "env_leads");

        let args = Args::try_parse_from(["leadgate-ingest"]).unwrap();
        let config = args.resolve().unwrap();

        assert_eq!(config.leads_table_name, "env_leads");
        assert_eq!(config.region, "eu-west-1");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_table_name_is_config_error() {
        clear_env();
        let argv = ["leadgate-ingest", "--leads-table-name", "9leads"];
        let args = Args::try_parse_from(argv).unwrap();
        assert!(args.resolve().is_err());
    }
}
