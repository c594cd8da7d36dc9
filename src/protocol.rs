//! Tuya v3.1 wire protocol implementation.
//! Handles command templates, frame construction and reply parsing.

use crate::codec;
use crate::crypto::{self, TuyaCipher};
use crate::error::{Result, TuyaError};
use byteorder::{BigEndian, ByteOrder};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Version tag carried in front of encrypted payloads.
pub const PROTOCOL_VERSION: &[u8] = b"3.1";

/// Bytes stripped from the front of every reply.
pub const REPLY_HEADER_LEN: usize = 20;
/// Bytes stripped from the end of every reply.
pub const REPLY_FOOTER_LEN: usize = 8;
/// Length of the signature fragment following the version tag.
pub const SIGNATURE_LEN: usize = 16;
/// Largest value the one-byte length field can carry.
pub const MAX_ENVELOPE_LEN: usize = 0xff;

pub const DEV_TYPE_DEFAULT: &str = "device";

const KEY_GW_ID: &str = "gwId";
const KEY_DEV_ID: &str = "devId";
const KEY_UID: &str = "uid";
const KEY_T: &str = "t";
const KEY_DPS: &str = "dps";

define_command_type! {
    Control = 0x07,
    DpQuery = 0x0a,
}

/// The two kinds of command a session can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Status,
    Set,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Status => f.write_str("status"),
            CommandKind::Set => f.write_str("set"),
        }
    }
}

/// Command byte plus the JSON skeleton fields, in wire order.
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate {
    pub command: CommandType,
    pub fields: &'static [&'static str],
}

/// Envelope constants and command templates for one device type.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTemplates {
    pub dev_type: &'static str,
    /// Hex string written before the command byte
    pub prefix: &'static str,
    /// Hex string written after the payload
    pub suffix: &'static str,
    pub status: Option<CommandTemplate>,
    pub set: Option<CommandTemplate>,
}

impl DeviceTemplates {
    pub fn command(&self, kind: CommandKind) -> Option<&CommandTemplate> {
        match kind {
            CommandKind::Status => self.status.as_ref(),
            CommandKind::Set => self.set.as_ref(),
        }
    }
}

// Matches the request table used by tuyapi for v3.1 outlets.
static DEVICE_TEMPLATES: &[DeviceTemplates] = &[DeviceTemplates {
    dev_type: DEV_TYPE_DEFAULT,
    prefix: "000055aa00000000000000",
    suffix: "000000000000aa55",
    status: Some(CommandTemplate {
        command: CommandType::DpQuery,
        fields: &[KEY_GW_ID, KEY_DEV_ID],
    }),
    set: Some(CommandTemplate {
        command: CommandType::Control,
        fields: &[KEY_DEV_ID, KEY_UID, KEY_T],
    }),
}];

/// Look up the templates registered for `dev_type`.
pub fn templates(dev_type: &str) -> Option<&'static DeviceTemplates> {
    DEVICE_TEMPLATES.iter().find(|t| t.dev_type == dev_type)
}

/// Fill a template's skeleton with the device id and timestamp, then attach `dps`.
pub fn command_json(
    template: &CommandTemplate,
    dev_id: &str,
    timestamp: u64,
    data: Option<Value>,
) -> Value {
    let mut payload = Map::new();
    for &field in template.fields {
        let value = match field {
            KEY_GW_ID | KEY_DEV_ID | KEY_UID => Value::from(dev_id),
            KEY_T => Value::from(timestamp.to_string()),
            _ => Value::from(""),
        };
        payload.insert(field.to_string(), value);
    }
    if let Some(d) = data {
        payload.insert(KEY_DPS.into(), d);
    }
    Value::Object(payload)
}

/// Serialize compactly with every space removed. Devices ignore payloads containing spaces.
pub fn compact_json(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.retain(|&b| b != b' ');
    Ok(bytes)
}

/// Encrypt and sign a set payload: `version ++ signature ++ base64(ciphertext)`.
pub fn seal_payload(json: &[u8], local_key: &[u8]) -> Result<Vec<u8>> {
    let ciphertext_b64 = {
        let cipher = TuyaCipher::new(local_key)?;
        cipher.encrypt_b64(json)
    };
    let signature = crypto::signature(&ciphertext_b64, PROTOCOL_VERSION, local_key);

    let mut payload =
        Vec::with_capacity(PROTOCOL_VERSION.len() + signature.len() + ciphertext_b64.len());
    payload.extend_from_slice(PROTOCOL_VERSION);
    payload.extend_from_slice(&signature);
    payload.extend_from_slice(&ciphertext_b64);
    Ok(payload)
}

/// Wrap `payload` in the device type's envelope.
///
/// Layout: prefix, command byte, three zero bytes, length byte, payload, suffix.
/// The length covers payload and suffix and must fit in one byte.
pub fn wrap_envelope(
    templates: &DeviceTemplates,
    command: CommandType,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let prefix = codec::hex_decode(templates.prefix)?;
    let suffix = codec::hex_decode(templates.suffix)?;

    let length = payload.len() + suffix.len();
    if length > MAX_ENVELOPE_LEN {
        return Err(TuyaError::PayloadTooLarge(length));
    }

    let mut length_field = [0u8; 4];
    BigEndian::write_u32(&mut length_field, length as u32);

    let mut frame = Vec::with_capacity(prefix.len() + 1 + length_field.len() + length);
    frame.extend_from_slice(&prefix);
    frame.push(command.as_u8());
    frame.extend_from_slice(&length_field);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&suffix);
    Ok(frame)
}

/// Build a complete frame for `kind` using the given templates.
///
/// Set commands are encrypted and signed with `local_key`; status queries go out
/// as plaintext JSON.
pub fn build_frame(
    templates: &DeviceTemplates,
    kind: CommandKind,
    dev_id: &str,
    local_key: &[u8],
    data: Option<Value>,
    timestamp: u64,
) -> Result<Vec<u8>> {
    let template = templates
        .command(kind)
        .ok_or_else(|| TuyaError::UnknownCommand {
            dev_type: templates.dev_type.to_string(),
            kind: kind.to_string(),
        })?;

    let json = compact_json(&command_json(template, dev_id, timestamp, data))?;
    debug!("json_payload={}", String::from_utf8_lossy(&json));

    let payload = match kind {
        CommandKind::Set => seal_payload(&json, local_key)?,
        CommandKind::Status => json,
    };

    let frame = wrap_envelope(templates, template.command, &payload)?;
    debug!(
        "Built {} frame: cmd=0x{:02X}, len={}",
        kind,
        template.command.as_u8(),
        frame.len()
    );
    Ok(frame)
}

/// Like [`build_frame`], looking the templates up by device type.
pub fn build_frame_for(
    dev_type: &str,
    kind: CommandKind,
    dev_id: &str,
    local_key: &[u8],
    data: Option<Value>,
    timestamp: u64,
) -> Result<Vec<u8>> {
    let templates = templates(dev_type).ok_or_else(|| TuyaError::UnknownCommand {
        dev_type: dev_type.to_string(),
        kind: kind.to_string(),
    })?;
    build_frame(templates, kind, dev_id, local_key, data, timestamp)
}

/// How the ciphertext in an encrypted reply is encoded.
///
/// Outgoing ciphertext is Base64, while replies are read as raw bytes by default.
/// The raw reading has not been confirmed on live hardware; switch to `Base64`
/// if a device turns out to mirror the outgoing format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyEncoding {
    #[default]
    Raw,
    Base64,
}

/// Options for decoding encrypted replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyOptions {
    pub encoding: ReplyEncoding,
    /// Check the signature fragment before decrypting
    pub verify_signature: bool,
}

/// Encrypted section of a reply, after the version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedReply<'a> {
    pub signature: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl EncryptedReply<'_> {
    /// Decrypt with `local_key`, optionally checking the signature first.
    pub fn decrypt(&self, local_key: &[u8], options: &ReplyOptions) -> Result<Vec<u8>> {
        let cipher = TuyaCipher::new(local_key)?;

        if options.verify_signature {
            let signed = match options.encoding {
                ReplyEncoding::Base64 => self.ciphertext.to_vec(),
                ReplyEncoding::Raw => {
                    use base64::{Engine as _, engine::general_purpose};
                    general_purpose::STANDARD
                        .encode(self.ciphertext)
                        .into_bytes()
                }
            };
            if crypto::signature(&signed, PROTOCOL_VERSION, local_key) != self.signature {
                return Err(TuyaError::SignatureMismatch);
            }
        }

        match options.encoding {
            ReplyEncoding::Raw => cipher.decrypt(self.ciphertext),
            ReplyEncoding::Base64 => cipher.decrypt_b64(self.ciphertext),
        }
    }
}

/// Strip the fixed reply envelope. Short replies are rejected, not sliced.
pub fn reply_body(raw: &[u8]) -> Result<&[u8]> {
    if raw.len() < REPLY_HEADER_LEN + REPLY_FOOTER_LEN {
        return Err(TuyaError::UnexpectedPayload(raw.to_vec()));
    }
    Ok(&raw[REPLY_HEADER_LEN..raw.len() - REPLY_FOOTER_LEN])
}

/// Parse a raw reply into a status.
///
/// Plaintext bodies (starting with `{`) are decoded directly. Bodies starting with
/// the version tag are handed to `decrypt` exactly once. Anything else is rejected.
pub fn parse_reply<F>(raw: &[u8], decrypt: F) -> Result<DeviceStatus>
where
    F: FnOnce(EncryptedReply<'_>) -> Result<Vec<u8>>,
{
    let body = reply_body(raw)?;
    debug!("result={}", hex::encode(body));

    if body.starts_with(b"{") {
        return Ok(serde_json::from_slice(body)?);
    }

    if let Some(rest) = body.strip_prefix(PROTOCOL_VERSION) {
        if rest.len() < SIGNATURE_LEN {
            return Err(TuyaError::UnexpectedPayload(raw.to_vec()));
        }
        let (signature, ciphertext) = rest.split_at(SIGNATURE_LEN);
        let plaintext = decrypt(EncryptedReply {
            signature,
            ciphertext,
        })?;
        debug!("decrypted result={}", String::from_utf8_lossy(&plaintext));
        return Ok(serde_json::from_slice(&plaintext)?);
    }

    error!("Unexpected status payload: {}", hex::encode(body));
    Err(TuyaError::UnexpectedPayload(raw.to_vec()))
}

/// Parse a raw status reply, decrypting with `local_key` when needed.
pub fn parse_status(raw: &[u8], local_key: &[u8], options: &ReplyOptions) -> Result<DeviceStatus> {
    parse_reply(raw, |reply| reply.decrypt(local_key, options))
}

/// Decoded status reply: `{"devId": .., "dps": {..}, "t": .., "s": ..}`.
///
/// Any dps index may be missing, and unknown top-level fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(rename = "devId", default, skip_serializing_if = "Option::is_none")]
    pub dev_id: Option<String>,
    #[serde(default)]
    pub dps: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceStatus {
    /// Value of a dps entry, if the device reported it.
    pub fn dps_value(&self, index: &str) -> Option<&Value> {
        self.dps.get(index)
    }

    /// Switch state of a dps entry, if it holds a boolean.
    pub fn is_on(&self, index: u32) -> Option<bool> {
        self.dps_value(&index.to_string()).and_then(Value::as_bool)
    }

    /// Device timestamp in epoch seconds. Accepts numbers and numeric strings.
    pub fn timestamp(&self) -> Option<u64> {
        match self.t.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}
