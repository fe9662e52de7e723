use routerlink_api::DeviceClient;

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::emit;

pub async fn handle(client: &DeviceClient, global: &GlobalOpts) -> Result<(), CliError> {
    emit(client.get_wireless_registrations().await?, global)
}
