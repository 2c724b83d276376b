//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the subset the content channel needs is understood: the default
//! namespace, text frames, heartbeats and plain events. Binary attachments
//! and acknowledgement callbacks are not.

use serde_json::Value;

use crate::traits::TransportError;

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake (`0{...}`), carries `sid` and ping settings.
    Open(Value),
    /// Engine.IO close (`1`).
    Close,
    /// Engine.IO heartbeat from the server (`2`).
    Ping,
    /// Engine.IO heartbeat reply (`3`).
    Pong,
    /// Socket.IO namespace connect (`40`), with the optional auth/ack object.
    Connect(Option<Value>),
    /// Socket.IO namespace disconnect (`41`).
    Disconnect,
    /// Socket.IO event (`42["name", payload]`).
    Event { name: String, payload: Value },
    /// Socket.IO namespace connect refused (`44{...}`).
    ConnectError(Value),
    /// Engine.IO noop (`6`).
    Noop,
}

impl Packet {
    /// Build an event packet.
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Packet::Event {
            name: name.into(),
            payload,
        }
    }

    /// Encode to the text frame sent over the WebSocket.
    pub fn encode(&self) -> String {
        match self {
            Packet::Open(data) => format!("0{}", data),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(data)) => format!("40{}", data),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, payload } => {
                let body = Value::Array(vec![Value::String(name.clone()), payload.clone()]);
                format!("42{}", body)
            }
            Packet::ConnectError(data) => format!("44{}", data),
            Packet::Noop => "6".to_string(),
        }
    }

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        let mut chars = text.chars();
        let engine_type = chars
            .next()
            .ok_or_else(|| TransportError::Protocol("empty frame".to_string()))?;
        let rest = chars.as_str();

        match engine_type {
            '0' => Ok(Packet::Open(parse_json(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket_packet(rest),
            '6' => Ok(Packet::Noop),
            other => Err(TransportError::Protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }
}

fn decode_socket_packet(text: &str) -> Result<Packet, TransportError> {
    let mut chars = text.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| TransportError::Protocol("empty message packet".to_string()))?;
    let body = strip_namespace(chars.as_str());

    match socket_type {
        '0' => {
            if body.is_empty() {
                Ok(Packet::Connect(None))
            } else {
                Ok(Packet::Connect(Some(parse_json(body)?)))
            }
        }
        '1' => Ok(Packet::Disconnect),
        '2' => {
            // Ack ids precede the array; the channel never requests acks.
            let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
            match parse_json(body)? {
                Value::Array(mut items) if !items.is_empty() => {
                    let name = match items.remove(0) {
                        Value::String(name) => name,
                        other => {
                            return Err(TransportError::Protocol(format!(
                                "event name is not a string: {}",
                                other
                            )))
                        }
                    };
                    let payload = if items.is_empty() {
                        Value::Null
                    } else {
                        items.remove(0)
                    };
                    Ok(Packet::Event { name, payload })
                }
                other => Err(TransportError::Protocol(format!(
                    "event body is not a non-empty array: {}",
                    other
                ))),
            }
        }
        '4' => Ok(Packet::ConnectError(if body.is_empty() {
            Value::Null
        } else {
            parse_json(body)?
        })),
        other => Err(TransportError::Protocol(format!(
            "unsupported socket packet type '{}'",
            other
        ))),
    }
}

/// Drop a leading `/namespace,` if present.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn parse_json(text: &str) -> Result<Value, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Build the Engine.IO WebSocket endpoint for a socket base URL.
///
/// `https://` and `http://` are mapped to `wss://` and `ws://`.
pub fn engine_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/socket.io/?EIO=4&transport=websocket", base)
}
