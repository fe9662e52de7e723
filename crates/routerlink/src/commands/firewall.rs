//! Firewall command handlers.

use routerlink_api::DeviceClient;

use crate::cli::{FirewallArgs, FirewallCommand, GlobalOpts};
use crate::error::CliError;

use super::emit;

pub async fn handle(
    client: &DeviceClient,
    args: FirewallArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FirewallCommand::Filter => emit(client.list_firewall_filter_rules().await?, global),
        FirewallCommand::Nat => emit(client.list_firewall_nat_rules().await?, global),
    }
}
