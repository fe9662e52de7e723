//! System command handlers.

use routerlink_api::DeviceClient;

use crate::cli::{GlobalOpts, SystemArgs, SystemCommand};
use crate::error::CliError;

use super::emit;

pub async fn handle(
    client: &DeviceClient,
    args: SystemArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SystemCommand::Resource => emit(client.get_system_resource().await?, global),
        SystemCommand::Identity => emit(client.get_system_identity().await?, global),
        SystemCommand::Health => emit(client.get_system_health().await?, global),
        SystemCommand::Metrics => emit(client.get_formatted_system_metrics().await?, global),
    }
}
