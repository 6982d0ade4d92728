//! Socket.IO v5 over Engine.IO v4 text framing.
//!
//! The controller's terminal channel is a Socket.IO server. Only the parts
//! the terminal needs are covered: the Engine.IO open/ping/pong/close
//! packets and the Socket.IO connect, disconnect and event packets on the
//! default namespace. Binary attachments and acknowledgements are ignored.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Engine.IO handshake payload (`0{...}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO `0`.
    Open(OpenInfo),
    /// Engine.IO `1`.
    Close,
    /// Engine.IO `2`; must be answered with [`Packet::Pong`].
    Ping,
    /// Engine.IO `3`.
    Pong,
    /// Socket.IO `40`, with the optional auth/sid payload.
    Connect(Option<Value>),
    /// Socket.IO `41`.
    Disconnect,
    /// Socket.IO `42["name", data]`.
    Event { name: String, data: Value },
    /// Socket.IO `44{...}`.
    ConnectError(Value),
    /// Anything valid that the terminal does not act on.
    Noop,
}

impl Packet {
    /// Encode to a text frame. `Open` and `ConnectError` are server-only
    /// and encode as a noop.
    pub fn encode(&self) -> String {
        match self {
            Self::Close => "1".into(),
            Self::Ping => "2".into(),
            Self::Pong => "3".into(),
            Self::Connect(None) => "40".into(),
            Self::Connect(Some(auth)) => format!("40{auth}"),
            Self::Disconnect => "41".into(),
            Self::Event { name, data } => {
                let payload = Value::Array(vec![Value::String(name.clone()), data.clone()]);
                format!("42{payload}")
            }
            Self::Open(_) | Self::ConnectError(_) | Self::Noop => "6".into(),
        }
    }

    /// Shorthand for an outbound event frame.
    pub fn event(name: &str, data: Value) -> String {
        Self::Event {
            name: name.to_owned(),
            data,
        }
        .encode()
    }
}

/// Decode one text frame.
pub fn decode(frame: &str) -> Result<Packet, Error> {
    let malformed = |message: String| Error::MalformedResponse {
        message,
        body: frame.to_owned(),
    };

    let mut chars = frame.chars();
    let Some(kind) = chars.next() else {
        return Err(malformed("empty frame".into()));
    };
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| malformed(format!("open packet: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest).map_err(malformed),
        '5' | '6' => Ok(Packet::Noop),
        other => Err(malformed(format!("unknown packet type {other:?}"))),
    }
}

/// Decode the Socket.IO packet carried by an Engine.IO message.
fn decode_message(msg: &str) -> Result<Packet, String> {
    let mut chars = msg.chars();
    let kind = chars.next().ok_or("empty message packet")?;
    let payload = strip_ack_id(strip_namespace(chars.as_str()));

    let json = || -> Result<Option<Value>, String> {
        if payload.is_empty() {
            Ok(None)
        } else {
            serde_json::from_str(payload)
                .map(Some)
                .map_err(|e| format!("packet payload: {e}"))
        }
    };

    match kind {
        '0' => Ok(Packet::Connect(json()?)),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let Some(Value::Array(mut items)) = json()? else {
                return Err("event payload is not an array".into());
            };
            if items.is_empty() {
                return Err("event without a name".into());
            }
            let Value::String(name) = items.remove(0) else {
                return Err("event name is not a string".into());
            };
            let data = if items.is_empty() {
                Value::Null
            } else {
                items.remove(0)
            };
            Ok(Packet::Event { name, data })
        }
        '4' => Ok(Packet::ConnectError(json()?.unwrap_or(Value::Null))),
        '3' | '5' | '6' => Ok(Packet::Noop),
        other => Err(format!("unknown socket packet type {other:?}")),
    }
}

/// Drop a `/namespace,` prefix if present.
fn strip_namespace(s: &str) -> &str {
    if s.starts_with('/') {
        match s.find(',') {
            Some(idx) => &s[idx + 1..],
            None => "",
        }
    } else {
        s
    }
}

/// Drop a leading acknowledgement id.
fn strip_ack_id(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// WebSocket endpoint for a controller base URL.
///
/// `http://host:8080` becomes `ws://host:8080/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(base: &Url) -> Result<Url, Error> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let host = base
        .host_str()
        .ok_or_else(|| Error::SocketConnect(format!("no host in {base}")))?;
    let port = base.port().map(|p| format!(":{p}")).unwrap_or_default();
    let prefix = base.path().trim_end_matches('/');
    Ok(Url::parse(&format!(
        "{scheme}://{host}{port}{prefix}/socket.io/?EIO=4&transport=websocket"
    ))?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_open_handshake() {
        let packet = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
            .expect("valid open");
        assert_eq!(
            packet,
            Packet::Open(OpenInfo {
                sid: "abc".into(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn decodes_term_out_event() {
        let packet = decode(r#"42["term_out","$ ls\r\n"]"#).expect("valid event");
        assert_eq!(
            packet,
            Packet::Event {
                name: "term_out".into(),
                data: json!("$ ls\r\n"),
            }
        );
    }

    #[test]
    fn decodes_event_with_namespace_and_ack_id() {
        let packet = decode(r#"42/term,17["term_out","x"]"#).expect("valid event");
        assert!(matches!(packet, Packet::Event { ref name, .. } if name == "term_out"));
    }

    #[test]
    fn decodes_connect_and_errors() {
        assert_eq!(
            decode(r#"40{"sid":"s1"}"#).expect("connect"),
            Packet::Connect(Some(json!({"sid": "s1"})))
        );
        assert_eq!(decode("41").expect("disconnect"), Packet::Disconnect);
        assert_eq!(
            decode(r#"44{"message":"Not authorized"}"#).expect("connect error"),
            Packet::ConnectError(json!({"message": "Not authorized"}))
        );
        assert_eq!(decode("2").expect("ping"), Packet::Ping);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("9hello").is_err());
        assert!(decode("42{not json").is_err());
        assert!(decode("42[]").is_err());
    }

    #[test]
    fn encodes_client_packets() {
        assert_eq!(Packet::Connect(None).encode(), "40");
        assert_eq!(Packet::Pong.encode(), "3");
        assert_eq!(
            Packet::event("term_resize", json!({"cols": 120, "rows": 40})),
            r#"42["term_resize",{"cols":120,"rows":40}]"#
        );
        assert_eq!(Packet::event("term_in", json!("ls\r")), r#"42["term_in","ls\r"]"#);
    }

    #[test]
    fn socket_url_maps_scheme_and_path() {
        let http = Url::parse("http://bench.local:8080").expect("valid URL");
        assert_eq!(
            socket_url(&http).expect("socket URL").as_str(),
            "ws://bench.local:8080/socket.io/?EIO=4&transport=websocket"
        );

        let https = Url::parse("https://lab.example.com/panel/").expect("valid URL");
        assert_eq!(
            socket_url(&https).expect("socket URL").as_str(),
            "wss://lab.example.com/panel/socket.io/?EIO=4&transport=websocket"
        );
    }
}
