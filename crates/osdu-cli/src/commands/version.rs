//! `osdu version` command implementation

use crate::config::CliConfig;

/// Version and configuration location of this installation
pub fn version_info(config: &CliConfig) -> String {
    format!(
        "OSDU CLI version {}\nConfig file: {}",
        env!("CARGO_PKG_VERSION"),
        config.config_path().display()
    )
}

pub fn run(config: &CliConfig) {
    println!("{}", version_info(config));
}
