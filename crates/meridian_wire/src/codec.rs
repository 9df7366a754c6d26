//! Encoding and decoding of messages and state updates.
//!
//! All three encodings share an intermediate [`serde_json::Value`] shape.
//! Plain and opcode-array frames are JSON text; packed frames are the same
//! opcode arrays framed as MessagePack, with field paths replaced by 32-bit
//! path hashes and dynamic keys replaced by per-viewer slot tokens.

use bytes::Bytes;
use meridian_core::{ConcretePath, Patch, PatchOp, PathHash, PathPattern, StateUpdate};
use meridian_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ProtocolError;
use crate::message::{Direction, TransportMessage};
use crate::opcode::{
    DIR_FROM_CLIENT, DIR_FROM_SERVER, OP_ACTION, OP_ACTION_RESPONSE, OP_DIFF, OP_ERROR, OP_EVENT,
    OP_FIRST_SYNC, OP_JOIN, OP_JOIN_RESPONSE, OP_NO_CHANGE, PATCH_ADD, PATCH_REMOVE,
    PATCH_REPLACE,
};
use crate::slot::{SlotReader, SlotRef, SlotTable};

/// Negotiated wire encoding for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Encoding {
    /// Keyed JSON objects; readable, for debugging
    Plain,
    /// Positional JSON arrays with numeric opcodes
    OpcodeArray,
    /// Opcode arrays with path hashes, key slots, MessagePack framing
    #[default]
    Packed,
}

/// Stateless encoder/decoder for one negotiated encoding
///
/// Per-connection slot state lives in the caller's [`SlotTable`] /
/// [`SlotReader`] so one codec can serve many viewers.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    encoding: Encoding,
}

impl Codec {
    /// Create a codec for an encoding
    #[must_use]
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// The negotiated encoding
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Encode a transport message
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if serialization fails.
    pub fn encode_message(&self, message: &TransportMessage) -> Result<Bytes, ProtocolError> {
        let value = match self.encoding {
            Encoding::Plain => plain_message(message),
            Encoding::OpcodeArray | Encoding::Packed => opcode_message(message),
        };
        self.to_bytes(&value)
    }

    /// Decode a transport message
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` for unparseable bytes or a wrong shape, and
    /// `UnexpectedOpcode` for state-update opcodes, which belong to
    /// [`Codec::decode_update`].
    pub fn decode_message(&self, bytes: &[u8]) -> Result<TransportMessage, ProtocolError> {
        let value = self.from_bytes(bytes)?;
        match self.encoding {
            Encoding::Plain => decode_plain_message(&value),
            Encoding::OpcodeArray | Encoding::Packed => decode_opcode_message(&value),
        }
    }

    /// Encode a per-viewer state update
    ///
    /// A `FirstSync` resets `slots` before assigning; packed set patches in
    /// a firstSync carry the add op, in a diff the replace op.
    ///
    /// # Errors
    ///
    /// Returns `WrongKeyArity` when a patch's keys do not match its field's
    /// wildcard count, and `MalformedFrame` for undeclared fields.
    pub fn encode_update(
        &self,
        schema: &Schema,
        slots: &mut SlotTable,
        update: &StateUpdate,
    ) -> Result<Bytes, ProtocolError> {
        let value = match self.encoding {
            Encoding::Plain => plain_update(schema, update)?,
            Encoding::OpcodeArray => opcode_update(schema, update)?,
            Encoding::Packed => packed_update(schema, slots, update)?,
        };
        self.to_bytes(&value)
    }

    /// Decode a per-viewer state update
    ///
    /// A `FirstSync` resets `slots` before resolving.
    ///
    /// # Errors
    ///
    /// Returns the full range of [`ProtocolError`]: malformed frames,
    /// unknown path hashes or paths, wrong key arity, and slot desyncs.
    pub fn decode_update(
        &self,
        schema: &Schema,
        slots: &mut SlotReader,
        bytes: &[u8],
    ) -> Result<StateUpdate, ProtocolError> {
        let value = self.from_bytes(bytes)?;
        match self.encoding {
            Encoding::Plain => decode_plain_update(schema, &value),
            Encoding::OpcodeArray => decode_opcode_update(schema, &value),
            Encoding::Packed => decode_packed_update(schema, slots, &value),
        }
    }

    fn to_bytes(&self, value: &Value) -> Result<Bytes, ProtocolError> {
        let raw = match self.encoding {
            Encoding::Plain | Encoding::OpcodeArray => {
                serde_json::to_vec(value).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?
            }
            Encoding::Packed => {
                rmp_serde::to_vec(value).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?
            }
        };
        Ok(Bytes::from(raw))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Value, ProtocolError> {
        match self.encoding {
            Encoding::Plain | Encoding::OpcodeArray => {
                serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
            }
            Encoding::Packed => {
                rmp_serde::from_slice(bytes).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
            }
        }
    }
}

fn plain_message(message: &TransportMessage) -> Value {
    match message {
        TransportMessage::Join {
            player,
            client,
            payload,
        } => json!({"kind": "join", "player": player, "client": client, "payload": payload}),
        TransportMessage::JoinResponse { accepted, reason } => {
            json!({"kind": "joinResponse", "accepted": accepted, "reason": reason})
        }
        TransportMessage::Action {
            request,
            name,
            payload,
        } => json!({"kind": "action", "request": request, "name": name, "payload": payload}),
        TransportMessage::ActionResponse { request, result } => match result {
            Ok(value) => json!({"kind": "actionResponse", "request": request, "ok": value}),
            Err(message) => {
                json!({"kind": "actionResponse", "request": request, "error": message})
            }
        },
        TransportMessage::Event {
            direction,
            name,
            payload,
        } => json!({"kind": "event", "direction": direction, "name": name, "payload": payload}),
        TransportMessage::Error { code, message } => {
            json!({"kind": "error", "code": code, "message": message})
        }
    }
}

fn opcode_message(message: &TransportMessage) -> Value {
    match message {
        TransportMessage::Join {
            player,
            client,
            payload,
        } => json!([OP_JOIN, player, client, payload]),
        TransportMessage::JoinResponse { accepted, reason } => {
            json!([OP_JOIN_RESPONSE, accepted, reason])
        }
        TransportMessage::Action {
            request,
            name,
            payload,
        } => json!([OP_ACTION, request, name, payload]),
        TransportMessage::ActionResponse { request, result } => match result {
            Ok(value) => json!([OP_ACTION_RESPONSE, request, true, value]),
            Err(message) => json!([OP_ACTION_RESPONSE, request, false, message]),
        },
        TransportMessage::Event {
            direction,
            name,
            payload,
        } => {
            let dir = match direction {
                Direction::FromClient => DIR_FROM_CLIENT,
                Direction::FromServer => DIR_FROM_SERVER,
            };
            json!([OP_EVENT, dir, name, payload])
        }
        TransportMessage::Error { code, message } => json!([OP_ERROR, code, message]),
    }
}

fn decode_plain_message(value: &Value) -> Result<TransportMessage, ProtocolError> {
    let obj = expect_object(value)?;
    let kind = expect_str(required(obj, "kind")?, "kind")?;
    match kind {
        "join" => Ok(TransportMessage::Join {
            player: typed_field(obj, "player")?,
            client: typed_field(obj, "client")?,
            payload: required(obj, "payload")?.clone(),
        }),
        "joinResponse" => {
            let reason = match required(obj, "reason")? {
                Value::Null => None,
                other => Some(expect_str(other, "reason")?.to_string()),
            };
            Ok(TransportMessage::JoinResponse {
                accepted: expect_bool(required(obj, "accepted")?, "accepted")?,
                reason,
            })
        }
        "action" => Ok(TransportMessage::Action {
            request: expect_u32(required(obj, "request")?, "request")?,
            name: expect_str(required(obj, "name")?, "name")?.to_string(),
            payload: required(obj, "payload")?.clone(),
        }),
        "actionResponse" => {
            let request = expect_u32(required(obj, "request")?, "request")?;
            let result = if let Some(error) = obj.get("error") {
                Err(expect_str(error, "error")?.to_string())
            } else {
                Ok(required(obj, "ok")?.clone())
            };
            Ok(TransportMessage::ActionResponse { request, result })
        }
        "event" => Ok(TransportMessage::Event {
            direction: typed_field(obj, "direction")?,
            name: expect_str(required(obj, "name")?, "name")?.to_string(),
            payload: required(obj, "payload")?.clone(),
        }),
        "error" => Ok(TransportMessage::Error {
            code: u16::try_from(expect_u32(required(obj, "code")?, "code")?)
                .map_err(|_| ProtocolError::MalformedFrame("error code out of range".to_string()))?,
            message: expect_str(required(obj, "message")?, "message")?.to_string(),
        }),
        other => Err(ProtocolError::MalformedFrame(format!(
            "unknown message kind {other}"
        ))),
    }
}

fn decode_opcode_message(value: &Value) -> Result<TransportMessage, ProtocolError> {
    let arr = expect_array(value)?;
    let op = expect_u64(element(arr, 0)?, "opcode")?;
    match op {
        OP_JOIN => {
            expect_len(arr, 4)?;
            Ok(TransportMessage::Join {
                player: typed_element(arr, 1)?,
                client: typed_element(arr, 2)?,
                payload: arr[3].clone(),
            })
        }
        OP_JOIN_RESPONSE => {
            expect_len(arr, 3)?;
            let reason = match &arr[2] {
                Value::Null => None,
                other => Some(expect_str(other, "reason")?.to_string()),
            };
            Ok(TransportMessage::JoinResponse {
                accepted: expect_bool(&arr[1], "accepted")?,
                reason,
            })
        }
        OP_ACTION => {
            expect_len(arr, 4)?;
            Ok(TransportMessage::Action {
                request: expect_u32(&arr[1], "request")?,
                name: expect_str(&arr[2], "name")?.to_string(),
                payload: arr[3].clone(),
            })
        }
        OP_ACTION_RESPONSE => {
            expect_len(arr, 4)?;
            let result = if expect_bool(&arr[2], "ok flag")? {
                Ok(arr[3].clone())
            } else {
                Err(expect_str(&arr[3], "error message")?.to_string())
            };
            Ok(TransportMessage::ActionResponse {
                request: expect_u32(&arr[1], "request")?,
                result,
            })
        }
        OP_EVENT => {
            expect_len(arr, 4)?;
            let direction = match expect_u64(&arr[1], "direction")? {
                DIR_FROM_CLIENT => Direction::FromClient,
                DIR_FROM_SERVER => Direction::FromServer,
                other => return Err(ProtocolError::UnexpectedOpcode(other)),
            };
            Ok(TransportMessage::Event {
                direction,
                name: expect_str(&arr[2], "name")?.to_string(),
                payload: arr[3].clone(),
            })
        }
        OP_ERROR => {
            expect_len(arr, 3)?;
            Ok(TransportMessage::Error {
                code: u16::try_from(expect_u32(&arr[1], "code")?).map_err(|_| {
                    ProtocolError::MalformedFrame("error code out of range".to_string())
                })?,
                message: expect_str(&arr[2], "message")?.to_string(),
            })
        }
        other => Err(ProtocolError::UnexpectedOpcode(other)),
    }
}

fn plain_update(schema: &Schema, update: &StateUpdate) -> Result<Value, ProtocolError> {
    match update {
        StateUpdate::NoChange => Ok(json!({"kind": "noChange"})),
        StateUpdate::FirstSync(patches) => Ok(json!({
            "kind": "firstSync",
            "patches": plain_patches(schema, patches, true)?,
        })),
        StateUpdate::Diff(patches) => Ok(json!({
            "kind": "diff",
            "patches": plain_patches(schema, patches, false)?,
        })),
    }
}

fn plain_patches(
    schema: &Schema,
    patches: &[Patch],
    first_sync: bool,
) -> Result<Vec<Value>, ProtocolError> {
    patches
        .iter()
        .map(|patch| {
            let path = render_path(schema, &patch.path)?;
            Ok(match &patch.op {
                PatchOp::Set(value) if first_sync => {
                    json!({"path": path, "op": "add", "value": value})
                }
                PatchOp::Set(value) => json!({"path": path, "op": "replace", "value": value}),
                PatchOp::Delete => json!({"path": path, "op": "remove"}),
            })
        })
        .collect()
}

fn opcode_update(schema: &Schema, update: &StateUpdate) -> Result<Value, ProtocolError> {
    match update {
        StateUpdate::NoChange => Ok(json!([OP_NO_CHANGE])),
        StateUpdate::FirstSync(patches) => {
            Ok(json!([OP_FIRST_SYNC, opcode_patches(schema, patches, true)?]))
        }
        StateUpdate::Diff(patches) => {
            Ok(json!([OP_DIFF, opcode_patches(schema, patches, false)?]))
        }
    }
}

fn opcode_patches(
    schema: &Schema,
    patches: &[Patch],
    first_sync: bool,
) -> Result<Vec<Value>, ProtocolError> {
    patches
        .iter()
        .map(|patch| {
            let path = render_path(schema, &patch.path)?;
            Ok(match &patch.op {
                PatchOp::Set(value) if first_sync => json!([path, PATCH_ADD, value]),
                PatchOp::Set(value) => json!([path, PATCH_REPLACE, value]),
                PatchOp::Delete => json!([path, PATCH_REMOVE]),
            })
        })
        .collect()
}

fn packed_update(
    schema: &Schema,
    slots: &mut SlotTable,
    update: &StateUpdate,
) -> Result<Value, ProtocolError> {
    match update {
        StateUpdate::NoChange => Ok(json!([OP_NO_CHANGE])),
        StateUpdate::FirstSync(patches) => {
            slots.reset();
            Ok(json!([
                OP_FIRST_SYNC,
                packed_patches(schema, slots, patches, true)?
            ]))
        }
        StateUpdate::Diff(patches) => Ok(json!([
            OP_DIFF,
            packed_patches(schema, slots, patches, false)?
        ])),
    }
}

fn packed_patches(
    schema: &Schema,
    slots: &mut SlotTable,
    patches: &[Patch],
    first_sync: bool,
) -> Result<Vec<Value>, ProtocolError> {
    patches
        .iter()
        .map(|patch| {
            let decl = schema.field(patch.path.field).ok_or_else(|| {
                ProtocolError::MalformedFrame(format!(
                    "patch references undeclared field {}",
                    patch.path.field.as_u16()
                ))
            })?;
            let hash = schema.path_hash(patch.path.field).ok_or_else(|| {
                ProtocolError::MalformedFrame(format!(
                    "field {} is not sync-tracked",
                    decl.pattern
                ))
            })?;
            if patch.path.keys.len() != decl.pattern.wildcard_count() {
                return Err(ProtocolError::WrongKeyArity {
                    pattern: decl.pattern.as_str().to_string(),
                    expected: decl.pattern.wildcard_count(),
                    got: patch.path.keys.len(),
                });
            }
            let keys = keys_token(slots, &patch.path.keys);
            Ok(match &patch.op {
                PatchOp::Set(value) if first_sync => {
                    json!([hash.as_u32(), keys, PATCH_ADD, value])
                }
                PatchOp::Set(value) => json!([hash.as_u32(), keys, PATCH_REPLACE, value]),
                PatchOp::Delete => json!([hash.as_u32(), keys, PATCH_REMOVE]),
            })
        })
        .collect()
}

/// Encode dynamic keys as slot tokens: nil for scalars, one token for a
/// single wildcard, a token list otherwise. A first use emits a definition
/// token `[slot, key]`; later uses emit the bare slot number.
fn keys_token(slots: &mut SlotTable, keys: &[String]) -> Value {
    let mut tokens: Vec<Value> = keys
        .iter()
        .map(|key| match slots.get_or_define(key) {
            SlotRef::Existing(slot) => json!(slot),
            SlotRef::Defined(slot) => json!([slot, key]),
        })
        .collect();
    match tokens.len() {
        0 => Value::Null,
        1 => tokens.pop().unwrap_or(Value::Null),
        _ => Value::Array(tokens),
    }
}

fn decode_plain_update(schema: &Schema, value: &Value) -> Result<StateUpdate, ProtocolError> {
    let obj = expect_object(value)?;
    let kind = expect_str(required(obj, "kind")?, "kind")?;
    match kind {
        "noChange" => Ok(StateUpdate::NoChange),
        "firstSync" => Ok(StateUpdate::FirstSync(decode_plain_patches(schema, obj)?)),
        "diff" => Ok(StateUpdate::Diff(decode_plain_patches(schema, obj)?)),
        other => Err(ProtocolError::MalformedFrame(format!(
            "unknown update kind {other}"
        ))),
    }
}

fn decode_plain_patches(
    schema: &Schema,
    obj: &Map<String, Value>,
) -> Result<Vec<Patch>, ProtocolError> {
    expect_array(required(obj, "patches")?)?
        .iter()
        .map(|entry| {
            let entry = expect_object(entry)?;
            let raw_path = expect_str(required(entry, "path")?, "path")?;
            let path = match_instance_path(schema, raw_path)?;
            match expect_str(required(entry, "op")?, "op")? {
                "add" | "replace" => Ok(Patch::set(path, required(entry, "value")?.clone())),
                "remove" => Ok(Patch::delete(path)),
                other => Err(ProtocolError::MalformedFrame(format!(
                    "unknown patch op {other}"
                ))),
            }
        })
        .collect()
}

fn decode_opcode_update(schema: &Schema, value: &Value) -> Result<StateUpdate, ProtocolError> {
    let arr = expect_array(value)?;
    match expect_u64(element(arr, 0)?, "opcode")? {
        OP_NO_CHANGE => Ok(StateUpdate::NoChange),
        OP_FIRST_SYNC => Ok(StateUpdate::FirstSync(decode_opcode_patches(
            schema,
            element(arr, 1)?,
        )?)),
        OP_DIFF => Ok(StateUpdate::Diff(decode_opcode_patches(
            schema,
            element(arr, 1)?,
        )?)),
        other => Err(ProtocolError::UnexpectedOpcode(other)),
    }
}

fn decode_opcode_patches(schema: &Schema, value: &Value) -> Result<Vec<Patch>, ProtocolError> {
    expect_array(value)?
        .iter()
        .map(|entry| {
            let entry = expect_array(entry)?;
            let raw_path = expect_str(element(entry, 0)?, "path")?;
            let path = match_instance_path(schema, raw_path)?;
            match expect_u64(element(entry, 1)?, "patch op")? {
                PATCH_ADD | PATCH_REPLACE => Ok(Patch::set(path, element(entry, 2)?.clone())),
                PATCH_REMOVE => Ok(Patch::delete(path)),
                other => Err(ProtocolError::UnexpectedOpcode(other)),
            }
        })
        .collect()
}

fn decode_packed_update(
    schema: &Schema,
    slots: &mut SlotReader,
    value: &Value,
) -> Result<StateUpdate, ProtocolError> {
    let arr = expect_array(value)?;
    match expect_u64(element(arr, 0)?, "opcode")? {
        OP_NO_CHANGE => Ok(StateUpdate::NoChange),
        OP_FIRST_SYNC => {
            slots.reset();
            Ok(StateUpdate::FirstSync(decode_packed_patches(
                schema,
                slots,
                element(arr, 1)?,
            )?))
        }
        OP_DIFF => Ok(StateUpdate::Diff(decode_packed_patches(
            schema,
            slots,
            element(arr, 1)?,
        )?)),
        other => Err(ProtocolError::UnexpectedOpcode(other)),
    }
}

fn decode_packed_patches(
    schema: &Schema,
    slots: &mut SlotReader,
    value: &Value,
) -> Result<Vec<Patch>, ProtocolError> {
    expect_array(value)?
        .iter()
        .map(|entry| {
            let entry = expect_array(entry)?;
            if entry.len() < 3 {
                return Err(ProtocolError::MalformedFrame(
                    "packed patch too short".to_string(),
                ));
            }
            let raw_hash = u32::try_from(expect_u64(&entry[0], "path hash")?)
                .map_err(|_| ProtocolError::MalformedFrame("path hash out of range".to_string()))?;
            let field = schema
                .field_by_hash(PathHash::from_raw(raw_hash))
                .ok_or(ProtocolError::UnknownPathHash(raw_hash))?;
            let decl = schema.field(field).ok_or_else(|| {
                ProtocolError::MalformedFrame(format!(
                    "hash table names undeclared field {}",
                    field.as_u16()
                ))
            })?;
            let keys = decode_keys(slots, &decl.pattern, &entry[1])?;
            let path = ConcretePath::new(field, keys);
            match expect_u64(&entry[2], "patch op")? {
                PATCH_ADD | PATCH_REPLACE => Ok(Patch::set(path, element(entry, 3)?.clone())),
                PATCH_REMOVE => Ok(Patch::delete(path)),
                other => Err(ProtocolError::UnexpectedOpcode(other)),
            }
        })
        .collect()
}

/// Decode a keys token against the field's wildcard count. The expected
/// arity disambiguates a lone definition token from a token list.
fn decode_keys(
    slots: &mut SlotReader,
    pattern: &PathPattern,
    token: &Value,
) -> Result<Vec<String>, ProtocolError> {
    let expected = pattern.wildcard_count();
    let arity_err = || ProtocolError::WrongKeyArity {
        pattern: pattern.as_str().to_string(),
        expected,
        got: apparent_key_count(token),
    };
    match expected {
        0 => {
            if token.is_null() {
                Ok(Vec::new())
            } else {
                Err(arity_err())
            }
        }
        1 => {
            if token.is_null() {
                return Err(arity_err());
            }
            Ok(vec![decode_key_token(slots, token)?])
        }
        n => {
            let tokens = token.as_array().ok_or_else(arity_err)?;
            if tokens.len() != n {
                return Err(arity_err());
            }
            tokens
                .iter()
                .map(|t| decode_key_token(slots, t))
                .collect()
        }
    }
}

fn decode_key_token(slots: &mut SlotReader, token: &Value) -> Result<String, ProtocolError> {
    match token {
        Value::Number(n) => {
            let slot = n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    ProtocolError::MalformedFrame(format!("invalid slot reference {n}"))
                })?;
            Ok(slots.resolve(slot)?.to_string())
        }
        Value::Array(parts) if parts.len() == 2 => {
            let slot = u32::try_from(expect_u64(&parts[0], "slot number")?)
                .map_err(|_| ProtocolError::MalformedFrame("slot number out of range".to_string()))?;
            let key = expect_str(&parts[1], "slot key")?;
            slots.define(slot, key)?;
            Ok(key.to_string())
        }
        other => Err(ProtocolError::MalformedFrame(format!(
            "invalid key token {other}"
        ))),
    }
}

fn apparent_key_count(token: &Value) -> usize {
    match token {
        Value::Null => 0,
        // a lone definition token counts as one key
        Value::Array(parts) if parts.len() == 2 && parts[0].is_u64() && parts[1].is_string() => 1,
        Value::Array(parts) => parts.len(),
        _ => 1,
    }
}

fn render_path(schema: &Schema, path: &ConcretePath) -> Result<String, ProtocolError> {
    let decl = schema.field(path.field).ok_or_else(|| {
        ProtocolError::MalformedFrame(format!(
            "patch references undeclared field {}",
            path.field.as_u16()
        ))
    })?;
    decl.pattern
        .render(&path.keys)
        .map_err(|_| ProtocolError::WrongKeyArity {
            pattern: decl.pattern.as_str().to_string(),
            expected: decl.pattern.wildcard_count(),
            got: path.keys.len(),
        })
}

/// Match a patch path back to a field instance. Patches are instance
/// granular; a path reaching inside an instance is malformed here.
fn match_instance_path(schema: &Schema, raw: &str) -> Result<ConcretePath, ProtocolError> {
    let (field, m) = schema
        .match_path(raw)
        .ok_or_else(|| ProtocolError::UnknownPath(raw.to_string()))?;
    if !m.residual.is_empty() {
        return Err(ProtocolError::MalformedFrame(format!(
            "patch path {raw} addresses inside a field instance"
        )));
    }
    Ok(ConcretePath::new(field, m.keys))
}

fn expect_object(value: &Value) -> Result<&Map<String, Value>, ProtocolError> {
    value
        .as_object()
        .ok_or_else(|| ProtocolError::MalformedFrame("expected keyed object".to_string()))
}

fn expect_array(value: &Value) -> Result<&Vec<Value>, ProtocolError> {
    value
        .as_array()
        .ok_or_else(|| ProtocolError::MalformedFrame("expected array".to_string()))
}

fn expect_len(arr: &[Value], len: usize) -> Result<(), ProtocolError> {
    if arr.len() == len {
        Ok(())
    } else {
        Err(ProtocolError::MalformedFrame(format!(
            "expected {len} elements, got {}",
            arr.len()
        )))
    }
}

fn element<'a>(arr: &'a [Value], index: usize) -> Result<&'a Value, ProtocolError> {
    arr.get(index)
        .ok_or_else(|| ProtocolError::MalformedFrame(format!("missing element {index}")))
}

fn required<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value, ProtocolError> {
    obj.get(name)
        .ok_or_else(|| ProtocolError::MalformedFrame(format!("missing field {name}")))
}

fn typed_field<T: serde::de::DeserializeOwned>(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<T, ProtocolError> {
    serde_json::from_value(required(obj, name)?.clone())
        .map_err(|e| ProtocolError::MalformedFrame(format!("field {name}: {e}")))
}

fn typed_element<T: serde::de::DeserializeOwned>(
    arr: &[Value],
    index: usize,
) -> Result<T, ProtocolError> {
    serde_json::from_value(element(arr, index)?.clone())
        .map_err(|e| ProtocolError::MalformedFrame(format!("element {index}: {e}")))
}

fn expect_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, ProtocolError> {
    value
        .as_str()
        .ok_or_else(|| ProtocolError::MalformedFrame(format!("{what} must be a string")))
}

fn expect_bool(value: &Value, what: &str) -> Result<bool, ProtocolError> {
    value
        .as_bool()
        .ok_or_else(|| ProtocolError::MalformedFrame(format!("{what} must be a boolean")))
}

fn expect_u64(value: &Value, what: &str) -> Result<u64, ProtocolError> {
    value
        .as_u64()
        .ok_or_else(|| ProtocolError::MalformedFrame(format!("{what} must be an unsigned integer")))
}

fn expect_u32(value: &Value, what: &str) -> Result<u32, ProtocolError> {
    u32::try_from(expect_u64(value, what)?)
        .map_err(|_| ProtocolError::MalformedFrame(format!("{what} out of range")))
}
