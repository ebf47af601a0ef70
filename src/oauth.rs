//! OAuth Device-Authorization Flow
//!
//! The interactive bootstrap for a new identity: request a device code, show
//! the user code, poll the token endpoint until the user authorizes (or the
//! code dies). One logical sequence per invocation:
//! requested → polling → granted | denied | expired | provider error.
//!
//! Every await is a tokio cancellation point, so callers can abandon an
//! in-flight flow by dropping the future or racing it in a `select!`; the
//! `timeout` option bounds the whole flow with a hard deadline.

use std::process::Command;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::time::{sleep, timeout, Instant};

use crate::config::AgentCredConfig;
use crate::error::{DeviceFlowError, Error, Result};
use crate::types::{DeviceCodeResponse, DeviceFlowResult};

/// Grant type for device-code token polling.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Seconds added to the poll interval on a `slow_down` response.
const SLOW_DOWN_BACKOFF_SECS: u64 = 5;

/// Invoked with the user code and verification URL once they are known.
pub type UserCodeCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Options for `start_device_flow`.
pub struct DeviceFlowOptions {
    /// OAuth client id; falls back to the configured one.
    pub client_id: Option<String>,
    /// Called with `(user_code, verification_uri)`; a default message is
    /// printed when absent.
    pub on_user_code: Option<UserCodeCallback>,
    /// Hard deadline for the whole flow, on top of the provider's own
    /// device-code expiry.
    pub timeout: Option<Duration>,
    /// Attempt to open the verification URL in a local browser.
    pub open_browser: bool,
}

impl Default for DeviceFlowOptions {
    fn default() -> Self {
        Self {
            client_id: None,
            on_user_code: None,
            timeout: None,
            open_browser: true,
        }
    }
}

#[derive(Deserialize)]
struct TokenPollResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    error: Option<String>,
}

/// Ask the provider for a device code and the matching user code.
pub async fn request_device_code(
    client_id: Option<&str>,
    config: &AgentCredConfig,
) -> Result<DeviceCodeResponse> {
    let client_id = client_id.unwrap_or(&config.client_id);

    let resp = Client::new()
        .post(format!("{}/login/device/code", config.oauth_url))
        .header("Accept", "application/json")
        .form(&[("client_id", client_id)])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DeviceFlowError::Provider(format!(
            "device code request failed: http {}",
            status.as_u16()
        ))
        .into());
    }

    let code: DeviceCodeResponse = resp.json().await?;
    tracing::debug!(
        verification_uri = %code.verification_uri,
        expires_in = code.expires_in,
        interval = code.interval,
        "device code requested"
    );
    Ok(code)
}

/// Poll the token endpoint until the flow reaches a terminal state.
///
/// Waits `interval` seconds before each poll. `slow_down` adds five seconds
/// to every subsequent wait; `expired_token` or `expires_in` elapsing ends
/// the flow as expired.
pub async fn poll_for_access_token(
    device_code: &str,
    interval: u64,
    expires_in: u64,
    client_id: Option<&str>,
    config: &AgentCredConfig,
) -> Result<DeviceFlowResult> {
    let client_id = client_id.unwrap_or(&config.client_id);
    let http = Client::new();
    let started = Instant::now();
    let mut poll_interval = interval;

    loop {
        if started.elapsed().as_secs() >= expires_in {
            return Err(DeviceFlowError::Expired.into());
        }

        sleep(Duration::from_secs(poll_interval)).await;

        let resp = http
            .post(format!("{}/login/oauth/access_token", config.oauth_url))
            .header("Accept", "application/json")
            .form(&[
                ("client_id", client_id),
                ("device_code", device_code),
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeviceFlowError::Provider(format!(
                "token poll failed: http {}",
                status.as_u16()
            ))
            .into());
        }

        let data: TokenPollResponse = resp.json().await?;
        match data.error.as_deref() {
            Some("authorization_pending") => {
                tracing::trace!("authorization pending");
                continue;
            }
            Some("slow_down") => {
                poll_interval += SLOW_DOWN_BACKOFF_SECS;
                tracing::debug!(poll_interval, "provider asked to slow down");
                continue;
            }
            Some("expired_token") => return Err(DeviceFlowError::Expired.into()),
            Some("access_denied") => return Err(DeviceFlowError::Denied.into()),
            Some(code) => return Err(DeviceFlowError::Provider(code.to_string()).into()),
            None => {
                let access_token = data.access_token.ok_or_else(|| {
                    Error::from(DeviceFlowError::Provider(
                        "token response missing access_token".to_string(),
                    ))
                })?;
                tracing::info!("authorization granted");
                return Ok(DeviceFlowResult {
                    access_token,
                    token_type: data.token_type.unwrap_or_default(),
                });
            }
        }
    }
}

/// Run the whole flow: request a code, surface it to the user, poll until
/// the provider grants or kills it.
pub async fn start_device_flow(
    options: DeviceFlowOptions,
    config: &AgentCredConfig,
) -> Result<DeviceFlowResult> {
    let code = request_device_code(options.client_id.as_deref(), config).await?;

    match &options.on_user_code {
        Some(callback) => callback(&code.user_code, &code.verification_uri),
        None => println!(
            "\nOpen {} and enter code: {}\n",
            code.verification_uri, code.user_code
        ),
    }

    if options.open_browser {
        try_open_browser(&code.verification_uri);
    }

    let poll = poll_for_access_token(
        &code.device_code,
        code.interval,
        code.expires_in,
        options.client_id.as_deref(),
        config,
    );

    match options.timeout {
        Some(deadline) => timeout(deadline, poll)
            .await
            .map_err(|_| Error::from(DeviceFlowError::Expired))?,
        None => poll.await,
    }
}

/// Best effort; the user can always open the URL by hand.
fn try_open_browser(url: &str) {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "could not open browser");
    }
}
