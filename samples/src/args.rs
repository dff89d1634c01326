/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use vim_collector::{CertType, Config, Credentials};

use crate::{Error, Result};

/// Watch vSphere inventory objects and tasks through the property collector.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// vCenter or ESXi host to connect to.
    #[clap(short = 'H', long, conflicts_with = "config")]
    pub hostname: Option<String>,
    /// Port of the vim25 sdk endpoint. Defaults to 443.
    #[clap(short = 'P', long)]
    pub port: Option<u16>,
    /// Name of the user that logs in, e.g. administrator@vsphere.local.
    #[clap(short = 'u', long)]
    pub username: Option<String>,
    /// Password of the user.
    #[clap(short = 'p', long)]
    pub password: Option<String>,
    /// Read the connection settings from a json config file instead.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Location of the CA certificate (PEM), used to verify the certificate of the server.
    #[clap(long)]
    pub cacert: Option<PathBuf>,
    /// Trust any certificate, including expired and self-signed ones.
    /// Only use this against lab hosts.
    #[clap(long, parse(from_flag))]
    pub danger_disable_certificate_verification: bool,
    /// Accept certificates issued for another hostname.
    #[clap(long, parse(from_flag))]
    pub danger_disable_hostname_verification: bool,
    /// Timeout on a single request in seconds, long polls included.
    #[clap(short = 't', long)]
    pub timeout: Option<u64>,
    /// increase verbosity. Every additional v will increase the verbosity by one stage.
    /// verbose messages are send to stderr. turned of by default.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbosity: u8,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print changes to the name and runtime of virtual machines until
    /// interrupted.
    GetUpdates {
        /// Watch a single virtual machine instead of all of them.
        #[clap(long)]
        vm_name: Option<String>,
        /// Seconds the server may hold each poll.
        #[clap(long, default_value = "30")]
        max_wait: u32,
    },
    /// List the properties of all objects of a type.
    List {
        /// Managed object type, e.g. VirtualMachine or HostSystem.
        #[clap(long = "type")]
        object_type: String,
        /// Property path to retrieve. All properties if not given.
        #[clap(long)]
        property: Vec<String>,
        /// Maximum number of objects per page.
        #[clap(long)]
        page_size: Option<u32>,
    },
    /// Wait for a task to complete and print its outcome.
    WaitTask {
        /// Task reference, e.g. task-123.
        #[clap(long)]
        task: String,
        /// Seconds the server may hold each poll.
        #[clap(long, default_value = "30")]
        max_wait: u32,
    },
}

impl Args {
    pub fn init_logger(&self) {
        if let Err(e) = simplelog::TermLogger::init(
            match self.verbosity {
                0 => simplelog::LevelFilter::Info,
                1 => simplelog::LevelFilter::Debug,
                2.. => simplelog::LevelFilter::Trace,
            },
            simplelog::ConfigBuilder::new()
                .add_filter_ignore_str("want")
                .add_filter_ignore_str("mio")
                .add_filter_ignore_str("hyper")
                .add_filter_ignore_str("reqwest")
                .add_filter_ignore_str("trust_dns")
                .build(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Error: failed to initialize logging: {}", e);
            process::exit(1);
        }
    }

    /// Connection settings from the config file, or from the command line.
    /// Command-line flags override the file.
    pub async fn config(&self) -> Result<Config> {
        let mut config = match (&self.config, &self.hostname) {
            (Some(path), _) => Config::load(path).await?,
            (None, Some(hostname)) => Config::new(hostname),
            (None, None) => return Err(Error::MissingHost),
        };

        if self.port.is_some() {
            config.port = self.port;
        }
        if let Some(username) = &self.username {
            config.credentials = Some(Credentials {
                username: username.clone(),
                password: self.password.clone(),
            });
        }
        if let Some(cacert) = &self.cacert {
            config.certificate = Some((CertType::PEM, cacert.clone()));
        }
        if self.danger_disable_certificate_verification {
            config.disable_certificate_verification = Some(true);
        }
        if self.danger_disable_hostname_verification {
            config.disable_hostname_verification = Some(true);
        }
        if self.timeout.is_some() {
            config.request_timeout = self.timeout;
        }
        Ok(config)
    }
}
