//! Command-line and environment configuration of `cirrus-server`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use cirrus_action::{Capability, Policy};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "cirrus-server")]
#[command(about = "Single-tenant action runtime: init once, run many")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "CIRRUS_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "CIRRUS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Number of async worker threads (defaults to the number of CPUs)
    #[arg(long, env = "CIRRUS_WORKER_THREADS")]
    pub worker_threads: Option<NonZeroUsize>,

    /// Directory for archives extracted from init documents
    #[arg(long, env = "CIRRUS_SPILL_DIR")]
    pub spill_dir: Option<PathBuf>,

    /// Hosts the action may connect to (`*`, `*.example.com`, `api.example.com`)
    #[arg(long = "allow-host", env = "CIRRUS_ALLOW_HOSTS", value_delimiter = ',')]
    pub allow_hosts: Vec<String>,

    /// Paths the action may read
    #[arg(long = "allow-path", env = "CIRRUS_ALLOW_PATHS", value_delimiter = ',')]
    pub allow_paths: Vec<PathBuf>,

    /// Environment variables the action may read
    #[arg(long = "allow-env", env = "CIRRUS_ALLOW_ENV", value_delimiter = ',')]
    pub allow_env: Vec<String>,

    /// Let the action spawn processes
    #[arg(long, env = "CIRRUS_ALLOW_PROCESS")]
    pub allow_process: bool,

    /// Run a built-in action once, print `OK !` and exit
    #[arg(long)]
    pub self_test: bool,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// The policy every invocation of the loaded action runs under. Nothing
    /// is granted unless asked for.
    pub fn policy(&self) -> Policy {
        let mut policy = Policy::deny_all();
        if !self.allow_hosts.is_empty() {
            policy = policy.grant(Capability::Network {
                allowed_hosts: self.allow_hosts.clone(),
            });
        }
        if !self.allow_paths.is_empty() {
            policy = policy.grant(Capability::FileSystem {
                paths: self.allow_paths.clone(),
                read_only: true,
            });
        }
        if !self.allow_env.is_empty() {
            policy = policy.grant(Capability::Environment {
                keys: self.allow_env.clone(),
            });
        }
        if self.allow_process {
            policy = policy.grant(Capability::Process);
        }
        policy
    }
}
