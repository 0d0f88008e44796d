//! Engine.IO v4 / Socket.IO v5 packet codec (text packets only)

use serde::Deserialize;
use serde_json::Value;

use shared::{process_warn, Component, SharedError, SharedResult};

/// Separator between packets in one long-polling payload
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Parameters announced by the server in the open packet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> SharedResult<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SharedError::protocol("empty engine packet"))?;
        let data = chars.as_str();

        let packet = match kind {
            '0' => EnginePacket::Open(serde_json::from_str(data)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping,
            '3' => EnginePacket::Pong,
            '4' => EnginePacket::Message(data.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => return Err(SharedError::protocol(format!("unknown engine packet type '{other}'"))),
        };
        Ok(packet)
    }

    pub fn encode(&self) -> String {
        match self {
            // Clients never send open packets; the sid is enough to identify it.
            EnginePacket::Open(handshake) => format!("0{{\"sid\":\"{}\"}}", handshake.sid),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping => "2".to_string(),
            EnginePacket::Pong => "3".to_string(),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Split a polling response body into engine packets, skipping any that do not decode
pub fn decode_payload(body: &str) -> Vec<EnginePacket> {
    body.split(RECORD_SEPARATOR)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match EnginePacket::decode(part) {
            Ok(packet) => Some(packet),
            Err(e) => {
                process_warn!(Component::Bridge, "Skipping engine packet: {}", e);
                None
            }
        })
        .collect()
}

/// Join engine packets into one POST body
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    let mut body = String::new();
    for (i, packet) in packets.iter().enumerate() {
        if i > 0 {
            body.push(RECORD_SEPARATOR);
        }
        body.push_str(&packet.encode());
    }
    body
}

/// Socket.IO packet on the default namespace
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { id: Option<u64>, name: String, args: Vec<Value> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError(Value),
}

impl SocketPacket {
    pub fn event(name: &str, id: Option<u64>, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            id,
            name: name.to_string(),
            args,
        }
    }

    pub fn decode(text: &str) -> SharedResult<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SharedError::protocol("empty socket packet"))?;
        let mut rest = chars.as_str();

        if kind == '5' || kind == '6' {
            return Err(SharedError::protocol("binary packets are not supported"));
        }

        // Namespace prefix, e.g. "/admin,"
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(comma) => &rest[comma + 1..],
                None => "",
            };
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| SharedError::protocol(format!("bad packet id: {e}")))?,
            )
        } else {
            None
        };
        let data = &rest[digits..];

        let packet = match kind {
            '0' => SocketPacket::Connect(parse_optional(data)?),
            '1' => SocketPacket::Disconnect,
            '2' => {
                let mut args = parse_array(data)?;
                if args.is_empty() {
                    return Err(SharedError::protocol("event without a name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => return Err(SharedError::protocol(format!("event name is not a string: {other}"))),
                };
                SocketPacket::Event { id, name, args }
            }
            '3' => SocketPacket::Ack {
                id: id.ok_or_else(|| SharedError::protocol("ack without an id"))?,
                args: parse_array(data)?,
            },
            '4' => SocketPacket::ConnectError(parse_optional(data)?.unwrap_or(Value::Null)),
            other => return Err(SharedError::protocol(format!("unknown socket packet type '{other}'"))),
        };
        Ok(packet)
    }

    pub fn encode(&self) -> SharedResult<String> {
        let text = match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", serde_json::to_string(auth)?),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { id, name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                let id = id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{id}{}", serde_json::to_string(&array)?)
            }
            SocketPacket::Ack { id, args } => format!("3{id}{}", serde_json::to_string(args)?),
            SocketPacket::ConnectError(data) => format!("4{}", serde_json::to_string(data)?),
        };
        Ok(text)
    }

    /// Wrap into an engine message packet
    pub fn into_engine(self) -> SharedResult<EnginePacket> {
        Ok(EnginePacket::Message(self.encode()?))
    }
}

fn parse_optional(data: &str) -> SharedResult<Option<Value>> {
    if data.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(data)?))
    }
}

fn parse_array(data: &str) -> SharedResult<Vec<Value>> {
    match serde_json::from_str(data)? {
        Value::Array(values) => Ok(values),
        other => Err(SharedError::protocol(format!("expected a JSON array, got {other}"))),
    }
}
