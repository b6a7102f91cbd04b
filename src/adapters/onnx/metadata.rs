//! Lector mínimo de las props clave/valor que un export ONNX guarda en
//! `ModelProto.metadata_props`, sin depender de un esquema protobuf.
//!
//! Los exports de Ultralytics guardan los nombres de clase bajo la clave `names` como
//! un literal de diccionario Python, p. ej. `{0: 'person', 1: 'bicycle'}`.

use std::collections::HashMap;

/// `ModelProto.metadata_props`
pub const METADATA_PROPS_FIELD: u64 = 14;

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// Decodifica un varint base-128 en `pos`. Devuelve el valor y la posición siguiente,
/// o `None` si la entrada termina a mitad del varint o el valor desborda 64 bits.
fn read_varint(data: &[u8], mut pos: usize) -> Option<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    while let Some(&byte) = data.get(pos) {
        pos += 1;
        if shift >= 64 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some((value, pos));
        }
        shift += 7;
    }
    None
}

/// Lee un prefijo de longitud en `pos` y devuelve los límites del contenido, si caben.
fn read_len_delimited(data: &[u8], pos: usize) -> Option<(usize, usize)> {
    let (len, start) = read_varint(data, pos)?;
    let len = usize::try_from(len).ok()?;
    let end = start.checked_add(len)?;
    (end <= data.len()).then_some((start, end))
}

/// Decodifica un `StringStringEntryProto` (1 = clave, 2 = valor). Cualquier campo que no
/// sea UTF-8 bien formado y delimitado por longitud descarta la entrada entera.
fn parse_string_entry(data: &[u8]) -> Option<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    let mut pos = 0;
    while pos < data.len() {
        let (tag, next) = read_varint(data, pos)?;
        if tag & 0x7 != WIRE_LEN {
            return None;
        }
        let (start, end) = read_len_delimited(data, next)?;
        let text = std::str::from_utf8(&data[start..end]).ok()?;
        match tag >> 3 {
            1 => key = text.to_owned(),
            2 => value = text.to_owned(),
            _ => {}
        }
        pos = end;
    }
    Some((key, value))
}

/// Recorre un `ModelProto` serializado y recoge sus metadata props.
///
/// Los campos distintos de [`METADATA_PROPS_FIELD`] se saltan según su wire type. Una
/// entrada truncada o un wire type desconocido detienen el recorrido y se devuelve lo
/// recogido hasta entonces.
pub fn parse_model_metadata(data: &[u8]) -> HashMap<String, String> {
    let mut props = HashMap::new();
    let mut pos = 0;
    while pos < data.len() {
        let Some((tag, next)) = read_varint(data, pos) else {
            break;
        };
        let field = tag >> 3;
        pos = match tag & 0x7 {
            WIRE_VARINT => match read_varint(data, next) {
                Some((_, after)) => after,
                None => break,
            },
            WIRE_FIXED64 => next + 8,
            WIRE_FIXED32 => next + 4,
            WIRE_LEN => {
                let Some((start, end)) = read_len_delimited(data, next) else {
                    break;
                };
                if field == METADATA_PROPS_FIELD {
                    if let Some((key, value)) = parse_string_entry(&data[start..end]) {
                        if !key.is_empty() {
                            props.insert(key, value);
                        }
                    }
                }
                end
            }
            _ => break,
        };
        if pos > data.len() {
            break;
        }
    }
    props
}

/// Separa por las comas que quedan fuera de comillas. Una comilla abierta con `'` solo
/// se cierra con `'`, y lo mismo para `"`.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut open_quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match (open_quote, ch) {
            (None, '\'' | '"') => open_quote = Some(ch),
            (Some(q), c) if c == q => open_quote = None,
            (None, ',') => {
                entries.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < body.len() {
        entries.push(&body[start..]);
    }
    entries
}

/// Convierte un literal `{id: 'name', ...}` en un mapa id → nombre. Se descartan las
/// entradas sin dos puntos o cuya clave no es un entero.
pub fn parse_class_names(raw: &str) -> HashMap<i64, String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('{').unwrap_or(raw);
    let body = raw.strip_suffix('}').unwrap_or(raw);

    split_top_level(body)
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.trim().split_once(':')?;
            let id = key.trim().parse::<i64>().ok()?;
            let name = value.trim().trim_matches(|c| c == '\'' || c == '"');
            Some((id, name.to_owned()))
        })
        .collect()
}
