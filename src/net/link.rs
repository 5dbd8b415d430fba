//! Station-mode network link.
//!
//! Startup association blocks with bounded retries; after that the link is
//! only observed.  Loss is reported through [`NetworkLink::is_up`] and
//! recovery is requested with [`NetworkLink::reassociate`], which never waits.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::{LinkPort, RetryDecision, StartupHook, StartupStage};
use crate::config::{RetryPolicy, WifiCredentials};
use crate::error::LinkError;

pub struct NetworkLink<L> {
    port: L,
    up: bool,
}

impl<L: LinkPort> NetworkLink<L> {
    pub fn new(port: L) -> Self {
        Self { port, up: false }
    }

    /// Associate with the access point, retrying every `policy.delay_ms`.
    ///
    /// Returns once the station holds an address, or fails when the policy
    /// budget runs out or `hook` aborts.
    pub fn associate(
        &mut self,
        credentials: &WifiCredentials,
        policy: &RetryPolicy,
        delay: &mut impl DelayNs,
        hook: &mut impl StartupHook,
    ) -> Result<(), LinkError> {
        info!("WiFi: associating with '{}'", credentials.ssid);
        self.port.begin(credentials)?;

        let mut attempts = 0u32;
        loop {
            if self.port.is_associated() {
                self.up = true;
                info!("WiFi: connected after {attempts} retries");
                return Ok(());
            }
            attempts += 1;
            if policy.exhausted(attempts) {
                warn!("WiFi: giving up after {attempts} attempts");
                return Err(LinkError::AttemptsExhausted { attempts });
            }
            if hook.on_retry(StartupStage::Link, attempts) == RetryDecision::Abort {
                return Err(LinkError::Cancelled);
            }
            info!("Connecting to WiFi..");
            delay.delay_ms(policy.delay_ms);
        }
    }

    /// Current association status.  Logs transitions.
    pub fn is_up(&mut self) -> bool {
        let up = self.port.is_associated();
        if self.up && !up {
            warn!("WiFi: association lost");
        } else if !self.up && up {
            info!("WiFi: association restored");
        }
        self.up = up;
        up
    }

    /// Ask the driver to associate again.  Returns immediately.
    pub fn reassociate(&mut self) -> Result<(), LinkError> {
        self.port.reassociate()
    }

    pub fn port(&self) -> &L {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut L {
        &mut self.port
    }
}
