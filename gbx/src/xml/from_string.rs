use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use quick_xml::{events::Event, Reader};

use crate::xml::{Call, Fault, Response, Value};

/// Try to parse a `<methodCall>` in the input string.
pub fn read_method_call(input: &str) -> Result<Call> {
    let mut reader = reader_for(input);
    let mut buf = Vec::new();
    expect_root(b"methodCall", &mut reader, &mut buf)?;
    expect_tag(b"methodName", &mut reader, &mut buf)?;
    let name = reader.read_text(b"methodName", &mut buf)?;

    // A call without arguments may omit <params> altogether.
    let args = match reader.read_event(&mut buf)? {
        Event::Start(ref e) if e.name() == b"params" => {
            let args = read_params(&mut reader, &mut buf)?;
            reader.read_to_end(b"methodCall", &mut buf)?;
            args
        }
        Event::End(ref e) if e.name() == b"methodCall" => Vec::new(),
        ev => return tag_err(ev, "<params> or </methodCall>"),
    };

    Ok(Call { name, args })
}

/// Try to parse a `<methodResponse>` in the input string.
///
/// A `<fault>` is not an error here: it is returned as the `Err` variant
/// of the inner `Response`.
pub fn read_method_response(input: &str) -> Result<Response> {
    let mut reader = reader_for(input);
    let mut buf = Vec::new();
    expect_root(b"methodResponse", &mut reader, &mut buf)?;

    let response = match reader.read_event(&mut buf)? {
        Event::Start(ref e) if e.name() == b"params" => {
            let vals = read_params(&mut reader, &mut buf)?;
            match vals.into_iter().next() {
                Some(first_val) => Ok(first_val),
                None => return Err(anyhow!("expected a single param in <methodResponse>")),
            }
        }
        Event::Start(ref e) if e.name() == b"fault" => {
            expect_tag(b"value", &mut reader, &mut buf)?;
            let fault = read_value(&mut reader, &mut buf)?;
            reader.read_to_end(b"fault", &mut buf)?;
            Err(fault_from(fault)?)
        }
        ev => return tag_err(ev, "<params> or <fault>"),
    };

    reader.read_to_end(b"methodResponse", &mut buf)?;
    Ok(response)
}

/// Read a fault from a `{faultCode, faultString}` struct, as used both by
/// `<fault>` responses and by the elements of `system.multicall` responses.
pub fn fault_from(value: Value) -> Result<Fault> {
    let code = value.member("faultCode").and_then(Value::as_int);
    let msg = value.member("faultString").and_then(Value::as_str);
    match (code, msg) {
        (Some(code), Some(msg)) => Ok(Fault {
            code,
            msg: msg.to_string(),
        }),
        _ => Err(anyhow!("cannot read fault: {:?}", value)),
    }
}

fn reader_for(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    reader.expand_empty_elements(true);
    reader.trim_text(true);
    reader
}

fn read_params<B>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Vec<Value>>
where
    B: std::io::BufRead,
{
    let mut vals = Vec::new();
    loop {
        match reader.read_event(buf)? {
            Event::Start(e) if e.name() == b"param" => {
                expect_tag(b"value", reader, buf)?;
                vals.push(read_value(reader, buf)?);
                reader.read_to_end(b"param", buf)?;
            }
            Event::End(e) if e.name() == b"params" => break,
            ev => return tag_err(ev, "<param> or </params>"),
        };
    }
    Ok(vals)
}

/// Read the contents of a `<value>`, including its closing tag.
fn read_value<B>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Value>
where
    B: std::io::BufRead,
{
    let tag = match reader.read_event(buf)? {
        Event::Start(e) => e.name().to_vec(),

        // Untyped values are strings.
        Event::Text(e) => {
            let text = e.unescape_and_decode(reader)?;
            reader.read_to_end(b"value", buf)?;
            return Ok(Value::String(text));
        }
        Event::End(e) if e.name() == b"value" => return Ok(Value::String(String::new())),

        ev => return tag_err(ev, "a typed value"),
    };

    let value = match tag.as_slice() {
        b"i4" | b"int" => {
            let text = reader.read_text(&tag, buf)?;
            let i = text
                .parse()
                .with_context(|| format!("expected an integer, got '{}'", text))?;
            Value::Int(i)
        }
        b"double" => {
            let text = reader.read_text(b"double", buf)?;
            let f = text
                .parse()
                .with_context(|| format!("expected a double, got '{}'", text))?;
            Value::Double(f)
        }
        b"boolean" => match reader.read_text(b"boolean", buf)?.as_ref() {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            txt => return Err(anyhow!("expected 0 or 1, got {}", txt)),
        },
        b"string" => Value::String(reader.read_text(b"string", buf)?),
        b"base64" => {
            let text = reader.read_text(b"base64", buf)?;
            Value::Base64(base64_decode(&text)?)
        }
        b"array" => read_array(reader, buf)?,
        b"struct" => read_struct(reader, buf)?,
        other => {
            return Err(anyhow!(
                "unknown value type <{}>",
                String::from_utf8_lossy(other)
            ))
        }
    };

    reader.read_to_end(b"value", buf)?;
    Ok(value)
}

/// Decode Base64 to bytes.
pub fn base64_decode(b64: &str) -> Result<Vec<u8>> {
    // The base64 crate cannot decode with whitespace, but the game server
    // wraps text at 76 characters (specified by MIME) with '\r\n'.
    let unwrapped: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::decode(&unwrapped).context("expected a valid <base64> value")
}

fn read_array<B>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Value>
where
    B: std::io::BufRead,
{
    expect_tag(b"data", reader, buf)?;

    let mut vals = Vec::new();
    loop {
        match reader.read_event(buf)? {
            Event::Start(e) if e.name() == b"value" => {
                vals.push(read_value(reader, buf)?);
            }
            Event::End(e) if e.name() == b"data" => {
                reader.read_to_end(b"array", buf)?;
                break;
            }
            ev => return tag_err(ev, "<value> or </data>"),
        };
    }
    Ok(Value::Array(vals))
}

fn read_struct<B>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Value>
where
    B: std::io::BufRead,
{
    let mut members = BTreeMap::new();
    loop {
        match reader.read_event(buf)? {
            Event::Start(e) if e.name() == b"member" => {
                expect_tag(b"name", reader, buf)?;
                let name = reader.read_text(b"name", buf)?;
                expect_tag(b"value", reader, buf)?;
                let value = read_value(reader, buf)?;
                reader.read_to_end(b"member", buf)?;
                members.insert(name, value);
            }
            Event::End(e) if e.name() == b"struct" => break,
            ev => return tag_err(ev, "<member> or </struct>"),
        };
    }
    Ok(Value::Struct(members))
}

/// Expect the root element, skipping the `<?xml ... ?>` declaration,
/// which is optional, and any leading comments.
fn expect_root<B>(tag: &[u8], reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<()>
where
    B: std::io::BufRead,
{
    loop {
        match reader.read_event(buf)? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) => continue,
            Event::Start(ref e) if e.name() == tag => return Ok(()),
            ev => return tag_err(ev, std::str::from_utf8(tag)?),
        }
    }
}

fn expect_tag<B>(tag: &[u8], reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<()>
where
    B: std::io::BufRead,
{
    match reader.read_event(buf)? {
        Event::Start(ref e) if e.name() == tag => Ok(()),
        ev => tag_err(ev, std::str::from_utf8(tag)?),
    }
}

fn tag_err<T>(got: Event, expected: &str) -> Result<T> {
    Err(anyhow!(
        "XML parser got {:?}, but expected {}",
        got,
        expected
    ))
}
