//! Interface command handlers.

use std::time::Duration;

use routerlink_api::DeviceClient;

use crate::cli::{GlobalOpts, InterfacesArgs, InterfacesCommand};
use crate::error::CliError;

use super::emit;

pub async fn handle(
    client: &DeviceClient,
    args: InterfacesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InterfacesCommand::List => emit(client.list_interfaces().await?, global),
        InterfacesCommand::Get { id } => emit(client.get_interface(&id).await?, global),
        InterfacesCommand::Traffic { name, duration } => {
            let reply = client
                .monitor_interface_traffic(&name, Duration::from_secs(duration))
                .await?;
            emit(reply, global)
        }
    }
}
