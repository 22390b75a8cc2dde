//! Server power control
//!
//! Start, stop and shutdown requests are rejected with 409 while a server is
//! busy (provisioning, hot-plugging, another power transition). These wrappers
//! retry conflicts with a Fibonacci backoff until the operation timeout and
//! then wait for the server to report the requested power state.

use crate::backoff::FibonacciBackoff;
use crate::config::Timeouts;
use crate::error::ProviderError;
use gridscale_client::GridscaleClientTrait;
use std::fmt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerAction {
    Start,
    Stop,
    Shutdown,
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Power operations with conflict retry
pub struct PowerControl<'a> {
    client: &'a dyn GridscaleClientTrait,
    timeouts: Timeouts,
}

impl<'a> PowerControl<'a> {
    pub fn new(client: &'a dyn GridscaleClientTrait, timeouts: Timeouts) -> Self {
        Self { client, timeouts }
    }

    /// Power the server on
    pub async fn start(&self, server_uuid: &str) -> Result<(), ProviderError> {
        info!("Starting server {}", server_uuid);
        self.request(PowerAction::Start, server_uuid).await?;
        self.wait_for_power(server_uuid, true).await
    }

    /// Cut the power of the server
    pub async fn stop(&self, server_uuid: &str) -> Result<(), ProviderError> {
        info!("Stopping server {}", server_uuid);
        self.request(PowerAction::Stop, server_uuid).await?;
        self.wait_for_power(server_uuid, false).await
    }

    /// Ask the guest OS to power off; cuts the power if it does not comply in time
    pub async fn shutdown(&self, server_uuid: &str) -> Result<(), ProviderError> {
        info!("Shutting down server {}", server_uuid);
        self.request(PowerAction::Shutdown, server_uuid).await?;
        match self.wait_for_power(server_uuid, false).await {
            Err(ProviderError::Timeout { .. }) => {
                warn!("Server {} ignored the ACPI shutdown, stopping it", server_uuid);
                self.stop(server_uuid).await
            }
            other => other,
        }
    }

    async fn request(&self, action: PowerAction, server_uuid: &str) -> Result<(), ProviderError> {
        let attempts = async {
            let mut backoff = FibonacciBackoff::new(self.timeouts.poll_delay, self.timeouts.poll_delay * 10);
            loop {
                let result = match action {
                    PowerAction::Start => self.client.start_server(server_uuid).await,
                    PowerAction::Stop => self.client.stop_server(server_uuid).await,
                    PowerAction::Shutdown => self.client.shutdown_server(server_uuid).await,
                };
                match result {
                    Ok(()) => return Ok(()),
                    Err(e) if e.is_conflict() => {
                        let wait = backoff.next_backoff();
                        debug!("Server {} is busy, retrying {} in {:?}", server_uuid, action, wait);
                        sleep(wait).await;
                    }
                    Err(e) => {
                        return Err(ProviderError::remote(
                            format!("Error requesting {} of server ({})", action, server_uuid),
                            e,
                        ));
                    }
                }
            }
        };

        timeout(self.timeouts.operation, attempts).await.unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                kind: "server".to_string(),
                ids: server_uuid.to_string(),
                goal: format!("accept a {} request", action),
            })
        })
    }

    async fn wait_for_power(&self, server_uuid: &str, power: bool) -> Result<(), ProviderError> {
        let poll = async {
            loop {
                let server = self.client.get_server(server_uuid).await.map_err(|e| {
                    ProviderError::remote(format!("Error reading power state of server ({})", server_uuid), e)
                })?;
                if server.power == power {
                    return Ok(());
                }
                sleep(self.timeouts.poll_delay).await;
            }
        };

        timeout(self.timeouts.operation, poll).await.unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                kind: "server".to_string(),
                ids: server_uuid.to_string(),
                goal: if power { "power on" } else { "power off" }.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_timeouts, uuid};
    use gridscale_client::mock::helpers::server;
    use gridscale_client::{MockCall, MockGridscaleClient, MockOp};

    fn running_server() -> MockGridscaleClient {
        let mock = MockGridscaleClient::new("http://mock");
        let mut srv = server(&uuid(1), "web");
        srv.power = true;
        mock.add_server(srv);
        mock
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let mock = running_server();
        mock.fail_next(MockOp::StopServer, 409);
        mock.fail_next(MockOp::StopServer, 409);

        PowerControl::new(&mock, test_timeouts()).stop(&uuid(1)).await.unwrap();

        let stops = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::StopServer { .. }))
            .count();
        assert_eq!(stops, 3);
        assert!(!mock.server(&uuid(1)).unwrap().power);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mock = running_server();
        mock.fail_next(MockOp::StartServer, 500);

        let err = PowerControl::new(&mock, test_timeouts()).start(&uuid(1)).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_endless_conflict_times_out() {
        let mock = running_server();
        for _ in 0..1000 {
            mock.fail_next(MockOp::ShutdownServer, 409);
        }

        let err = PowerControl::new(&mock, test_timeouts())
            .shutdown(&uuid(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_powers_off() {
        let mock = running_server();
        PowerControl::new(&mock, test_timeouts()).shutdown(&uuid(1)).await.unwrap();
        assert!(!mock.server(&uuid(1)).unwrap().power);
        assert_eq!(mock.calls(), vec![MockCall::ShutdownServer { server: uuid(1) }]);
    }
}
