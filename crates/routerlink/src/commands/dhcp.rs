//! DHCP command handlers.

use routerlink_api::DeviceClient;

use crate::cli::{DhcpArgs, DhcpCommand, GlobalOpts};
use crate::error::CliError;

use super::emit;

pub async fn handle(
    client: &DeviceClient,
    args: DhcpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DhcpCommand::Servers => emit(client.list_dhcp_servers().await?, global),
        DhcpCommand::Leases { server } => {
            emit(client.get_dhcp_leases(server.as_deref()).await?, global)
        }
    }
}
