//! Command dispatch: bridges CLI args -> device client calls -> output formatting.

pub mod config_cmd;
pub mod dhcp;
pub mod firewall;
pub mod interfaces;
pub mod ip;
pub mod system;
pub mod watch;
pub mod wireless;

use serde::Serialize;

use routerlink_api::{ApiResponse, DeviceClient};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &DeviceClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::System(args) => system::handle(client, args, global).await,
        Command::Interfaces(args) => interfaces::handle(client, args, global).await,
        Command::Ip(args) => ip::handle(client, args, global).await,
        Command::Dhcp(args) => dhcp::handle(client, args, global).await,
        Command::Firewall(args) => firewall::handle(client, args, global).await,
        Command::Wireless => wireless::handle(client, global).await,
        // Watch, Config and Completions never reach a device client
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Err(
            CliError::Internal("command does not use the control-plane client".into()),
        ),
    }
}

/// Print the payload of a successful reply.
///
/// A `success: false` envelope is printed whole so scripts can inspect
/// `status` and `error`, then surfaces as an error (exit code 1).
pub fn emit<T: Serialize>(response: ApiResponse<T>, global: &GlobalOpts) -> Result<(), CliError> {
    if response.success {
        return match response.data {
            Some(ref data) => output::print(global.output, data),
            None => output::print(global.output, &serde_json::Value::Null),
        };
    }

    output::print(global.output, &response)?;
    Err(CliError::Api {
        status: response.status,
        message: response.error.unwrap_or_default(),
    })
}
