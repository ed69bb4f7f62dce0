//! App Fingerprint Payload
//!
//! The Vavoo signature endpoint validates a telemetry "ping" emulating a
//! specific Android client before it hands out an API signature. The payload
//! below reproduces that client's shape field-for-field. The upstream checks
//! the shape more than the values, but `package`/`version` are the fields
//! most likely to break on an app update, so they live in named constants.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::{json, Value};

/// App identity advertised in the ping. Update in lockstep with the
/// real client when the upstream starts rejecting the handshake.
pub const APP_PACKAGE: &str = "tv.vavoo.app";
pub const APP_VERSION: &str = "3.1.20";

const APP_BUILD_ID: &str = "289515000";
const APP_ENGINE: &str = "hbc85";
const APP_SIGNATURE: &str = "6e8a975e3cbf07d5de823a760d4c2547f86c1403105020adee5de67ac510999e";
const APP_INSTALLER: &str = "app.revanced.manager.flutter";

const DEVICE_BRAND: &str = "google";
const DEVICE_MODEL: &str = "Nexus";
const DEVICE_NAME: &str = "21081111RG";
const DEVICE_UNIQUE_ID: &str = "d10e5d99ab665233";

const OS_VERSION: &str = "7.1.2";

/// Fixed app-start timestamp carried in the ping (milliseconds). The real
/// client persists its first launch time; the upstream accepts any stable
/// value here.
const APP_START_MS: u64 = 1_743_962_904_623;

/// Opaque session token the client sends with every ping.
const PING_TOKEN: &str = "tosFwQCJMS8qrW_AjLoHPQ41646J5dRNha6ZWHnijoYQQQoADQoXYSo7ki7O5-CsgN4CH0uRk6EEoJ0728ar9scCRQW3ZkbfrPfeCXW2VgopSW2FWDqPOoVYIuVPAOnXCZ5g";

/// User agent of the emulated HTTP stack.
pub const PING_USER_AGENT: &str = "okhttp/4.11.0";

/// Build the fixed device/app fingerprint payload for the signature ping.
#[must_use]
pub fn ping_payload() -> Value {
    json!({
        "token": PING_TOKEN,
        "reason": "app-blur",
        "locale": "de",
        "theme": "dark",
        "metadata": {
            "device": {
                "type": "Handset",
                "brand": DEVICE_BRAND,
                "model": DEVICE_MODEL,
                "name": DEVICE_NAME,
                "uniqueId": DEVICE_UNIQUE_ID
            },
            "os": {
                "name": "android",
                "version": OS_VERSION,
                "abis": ["arm64-v8a", "armeabi-v7a", "armeabi"],
                "host": "android"
            },
            "app": {
                "platform": "android",
                "version": APP_VERSION,
                "buildId": APP_BUILD_ID,
                "engine": APP_ENGINE,
                "signatures": [APP_SIGNATURE],
                "installer": APP_INSTALLER
            },
            "version": {
                "package": APP_PACKAGE,
                "binary": APP_VERSION,
                "js": APP_VERSION
            }
        },
        "appFocusTime": 0,
        "playerActive": false,
        "playDuration": 0,
        "devMode": false,
        "hasAddon": true,
        "castConnected": false,
        "package": APP_PACKAGE,
        "version": APP_VERSION,
        "process": "app",
        "firstAppStart": APP_START_MS,
        "lastAppStart": APP_START_MS,
        "ipLocation": "",
        "adblockEnabled": true,
        "proxy": {
            "supported": ["ss", "openvpn"],
            "engine": "ss",
            "ssVersion": 1,
            "enabled": true,
            "autoServer": true,
            "id": "pl-waw"
        },
        "iap": {
            "supported": false
        }
    })
}

/// Headers sent with the signature ping.
#[must_use]
pub fn ping_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(PING_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_identity_fields() {
        let payload = ping_payload();
        assert_eq!(payload["package"], APP_PACKAGE);
        assert_eq!(payload["version"], APP_VERSION);
        assert_eq!(payload["metadata"]["version"]["package"], APP_PACKAGE);
        assert_eq!(payload["metadata"]["version"]["binary"], APP_VERSION);
        assert_eq!(payload["metadata"]["version"]["js"], APP_VERSION);
    }

    #[test]
    fn test_payload_shape() {
        let payload = ping_payload();
        assert_eq!(payload["reason"], "app-blur");
        assert_eq!(payload["metadata"]["device"]["model"], "Nexus");
        assert_eq!(payload["metadata"]["os"]["abis"].as_array().unwrap().len(), 3);
        assert_eq!(payload["proxy"]["engine"], "ss");
        assert_eq!(payload["firstAppStart"], payload["lastAppStart"]);
    }

    #[test]
    fn test_ping_headers() {
        let headers = ping_headers();
        assert_eq!(headers[USER_AGENT], PING_USER_AGENT);
        assert_eq!(headers[CONTENT_TYPE], "application/json; charset=utf-8");
    }
}
