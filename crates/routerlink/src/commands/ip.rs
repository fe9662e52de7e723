//! IP address, route and ARP handlers.

use routerlink_api::DeviceClient;

use crate::cli::{GlobalOpts, IpArgs, IpCommand};
use crate::error::CliError;

use super::emit;

pub async fn handle(
    client: &DeviceClient,
    args: IpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        IpCommand::Addresses => emit(client.list_ip_addresses().await?, global),
        IpCommand::Routes => emit(client.list_routes().await?, global),
        IpCommand::Arp => emit(client.get_arp_table().await?, global),
    }
}
