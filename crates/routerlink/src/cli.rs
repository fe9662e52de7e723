//! Clap derive structures for the `routerlink` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// routerlink -- talk to a router's control-plane API and telemetry stream
#[derive(Debug, Parser)]
#[command(
    name = "routerlink",
    version,
    about = "Query router control-plane APIs and follow live telemetry",
    long_about = "Query a router's REST control plane (system, interfaces, routing,\n\
        DHCP, firewall, wireless) and follow per-device telemetry from an\n\
        event-stream gateway.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "ROUTERLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device host name or address (overrides profile)
    #[arg(long, short = 'H', env = "ROUTERLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Device port (defaults to 443, or 80 with --no-tls)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Username for Basic auth
    #[arg(long, short = 'u', env = "ROUTERLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for Basic auth
    #[arg(long, env = "ROUTERLINK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Use plain HTTP instead of HTTPS
    #[arg(long, global = true)]
    pub no_tls: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Attempts per request before giving up
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ROUTERLINK_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// System resource, identity and health
    #[command(alias = "sys")]
    System(SystemArgs),

    /// Network interfaces and traffic counters
    #[command(alias = "if")]
    Interfaces(InterfacesArgs),

    /// IP addresses, routes and the ARP table
    Ip(IpArgs),

    /// DHCP servers and leases
    Dhcp(DhcpArgs),

    /// Firewall filter and NAT rules
    #[command(alias = "fw")]
    Firewall(FirewallArgs),

    /// Wireless client registrations
    #[command(alias = "wifi")]
    Wireless,

    /// Follow live telemetry for one device
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━ SYSTEM ━━━

#[derive(Debug, Args)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommand {
    /// Raw system resource record
    Resource,
    /// Device identity (name)
    Identity,
    /// Health sensors
    Health,
    /// Normalized CPU, memory, disk and temperature figures
    Metrics,
}

// ━━━ INTERFACES ━━━

#[derive(Debug, Args)]
pub struct InterfacesArgs {
    #[command(subcommand)]
    pub command: InterfacesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InterfacesCommand {
    /// List all interfaces
    #[command(alias = "ls")]
    List,

    /// Get one interface by id
    Get {
        /// Interface id (e.g. "*1")
        id: String,
    },

    /// Sample live traffic on an interface
    Traffic {
        /// Interface name (e.g. ether1)
        name: String,

        /// Sampling window in seconds
        #[arg(long, short = 'd', default_value = "1")]
        duration: u64,
    },
}

// ━━━ IP ━━━

#[derive(Debug, Args)]
pub struct IpArgs {
    #[command(subcommand)]
    pub command: IpCommand,
}

#[derive(Debug, Subcommand)]
pub enum IpCommand {
    /// Configured IP addresses
    Addresses,
    /// Routing table
    Routes,
    /// ARP table
    Arp,
}

// ━━━ DHCP ━━━

#[derive(Debug, Args)]
pub struct DhcpArgs {
    #[command(subcommand)]
    pub command: DhcpCommand,
}

#[derive(Debug, Subcommand)]
pub enum DhcpCommand {
    /// DHCP server instances
    Servers,

    /// Leases, optionally for one server
    Leases {
        /// Only leases handed out by this server
        #[arg(long, short = 's')]
        server: Option<String>,
    },
}

// ━━━ FIREWALL ━━━

#[derive(Debug, Args)]
pub struct FirewallArgs {
    #[command(subcommand)]
    pub command: FirewallCommand,
}

#[derive(Debug, Subcommand)]
pub enum FirewallCommand {
    /// Filter rules
    Filter,
    /// NAT rules
    Nat,
}

// ━━━ WATCH ━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Device to subscribe to
    pub device_id: String,

    /// Telemetry gateway URL (overrides the profile's stream_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Stop after this many messages
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ━━━ CONFIG ━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Display the loaded configuration, passwords redacted
    Show,
    /// Store a profile's password in the system keyring
    ///
    /// Uses --password when given, otherwise reads one line from stdin.
    SetPassword {
        /// Profile the password belongs to
        #[arg(value_name = "PROFILE")]
        name: String,
    },
}

// ━━━ COMPLETIONS ━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }
}
