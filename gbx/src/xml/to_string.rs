use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText};
use quick_xml::{events::Event, Writer};

use crate::xml::{Call, Response, Value};

/// Compose a `<methodCall>`.
///
/// # Panics
/// Panics if the composition fails, which can only happen if writing
/// to the in-memory buffer fails.
pub fn write_method_call(call: &Call) -> Vec<u8> {
    try_write_method_call(call)
        .unwrap_or_else(|err| panic!("failed to compose method call {}: {}", call.name, err))
}

fn try_write_method_call(call: &Call) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)))?;

    write_start_tag(b"methodCall", &mut writer)?;
    write_tag(b"methodName", &call.name, &mut writer)?;

    write_start_tag(b"params", &mut writer)?;
    for value in &call.args {
        write_start_tag(b"param", &mut writer)?;
        write_value(value, &mut writer)?;
        write_end_tag(b"param", &mut writer)?;
    }
    write_end_tag(b"params", &mut writer)?;
    write_end_tag(b"methodCall", &mut writer)?;

    Ok(writer.into_inner())
}

/// Compose a `<methodResponse>`, which is what an XML-RPC server answers
/// to a method call.
///
/// # Panics
/// Panics if the composition fails.
pub fn write_method_response(response: &Response) -> Vec<u8> {
    try_write_method_response(response)
        .unwrap_or_else(|err| panic!("failed to compose method response: {}", err))
}

fn try_write_method_response(response: &Response) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)))?;
    write_start_tag(b"methodResponse", &mut writer)?;
    match response {
        Ok(value) => {
            write_start_tag(b"params", &mut writer)?;
            write_start_tag(b"param", &mut writer)?;
            write_value(value, &mut writer)?;
            write_end_tag(b"param", &mut writer)?;
            write_end_tag(b"params", &mut writer)?;
        }
        Err(fault) => {
            let fault: Value = vec![
                ("faultCode", Value::Int(fault.code)),
                ("faultString", Value::String(fault.msg.clone())),
            ]
            .into_iter()
            .collect();
            write_start_tag(b"fault", &mut writer)?;
            write_value(&fault, &mut writer)?;
            write_end_tag(b"fault", &mut writer)?;
        }
    }
    write_end_tag(b"methodResponse", &mut writer)?;

    Ok(writer.into_inner())
}

/// Write a tag with escaped text content.
fn write_tag<W>(tag: &[u8], text: &str, writer: &mut Writer<W>) -> Result<(), quick_xml::Error>
where
    W: std::io::Write,
{
    write_start_tag(tag, writer)?;
    writer.write_event(Event::Text(BytesText::from_plain_str(text)))?;
    write_end_tag(tag, writer)?;
    Ok(())
}

fn write_start_tag<W>(tag: &[u8], writer: &mut Writer<W>) -> Result<(), quick_xml::Error>
where
    W: std::io::Write,
{
    writer.write_event(Event::Start(BytesStart::borrowed_name(tag)))?;
    Ok(())
}

fn write_end_tag<W>(tag: &[u8], writer: &mut Writer<W>) -> Result<(), quick_xml::Error>
where
    W: std::io::Write,
{
    writer.write_event(Event::End(BytesEnd::borrowed(tag)))?;
    Ok(())
}

fn write_value<W>(value: &Value, writer: &mut Writer<W>) -> Result<(), quick_xml::Error>
where
    W: std::io::Write,
{
    write_start_tag(b"value", writer)?;
    match value {
        Value::Int(i) => write_tag(b"int", &i.to_string(), writer)?,
        Value::Double(f) => write_tag(b"double", &f.to_string(), writer)?,
        Value::Bool(b) => write_tag(b"boolean", if *b { "1" } else { "0" }, writer)?,
        Value::String(s) => write_tag(b"string", s, writer)?,
        Value::Base64(bytes) => write_tag(b"base64", &base64_encode(bytes), writer)?,
        Value::Array(vs) => {
            write_start_tag(b"array", writer)?;
            write_start_tag(b"data", writer)?;
            for v in vs {
                write_value(v, writer)?;
            }
            write_end_tag(b"data", writer)?;
            write_end_tag(b"array", writer)?;
        }
        Value::Struct(members) => {
            write_start_tag(b"struct", writer)?;
            for (name, v) in members {
                write_start_tag(b"member", writer)?;
                write_tag(b"name", name, writer)?;
                write_value(v, writer)?;
                write_end_tag(b"member", writer)?;
            }
            write_end_tag(b"struct", writer)?;
        }
    }
    write_end_tag(b"value", writer)?;
    Ok(())
}

/// Encode bytes to Base64.
///
/// Lines are wrapped at 76 characters (specified by MIME) with '\r\n',
/// like the game server does.
pub fn base64_encode(bytes: &[u8]) -> String {
    const LINE_LENGTH: usize = 76;

    let unwrapped = base64::encode(bytes);
    let mut wrapped = String::with_capacity(unwrapped.len() + unwrapped.len() / LINE_LENGTH * 2);

    for (i, c) in unwrapped.chars().enumerate() {
        if i > 0 && i % LINE_LENGTH == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(c);
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{read_method_call, read_method_response, Fault};

    #[test]
    fn escape_text() {
        let call = Call::new("dedimania.PlayerConnect", vec![Value::from("<b>a&b</b>")]);
        let xml = String::from_utf8(write_method_call(&call)).unwrap();
        assert!(xml.contains("&lt;b&gt;a&amp;b&lt;/b&gt;"));
        assert_eq!(call, read_method_call(&xml).unwrap());
    }

    #[test]
    fn binary_as_base64() {
        let replay: Vec<u8> = (0..200u8).collect();
        let call = Call::new("dedimania.SetChallengeTimes", vec![Value::from(replay)]);
        let xml = String::from_utf8(write_method_call(&call)).unwrap();
        assert!(xml.contains("<base64>"));
        assert!(!xml.contains("<string>"));
        assert_eq!(call, read_method_call(&xml).unwrap());
    }

    #[test]
    fn nested_values() {
        let mut splits: Vec<i32> = vec![12_000, 24_500];
        splits.push(31_337);
        let time: Value = vec![
            ("Login", Value::from("tim")),
            ("Best", Value::from(31_337)),
            ("Checks", Value::from(splits)),
        ]
        .into_iter()
        .collect();
        let call = Call::new("system.multicall", vec![Value::Array(vec![time])]);
        let xml = String::from_utf8(write_method_call(&call)).unwrap();
        assert_eq!(call, read_method_call(&xml).unwrap());
    }

    #[test]
    fn response_and_fault() {
        let response: Response = Ok(Value::Array(vec![Value::from(true)]));
        let xml = String::from_utf8(write_method_response(&response)).unwrap();
        assert_eq!(response, read_method_response(&xml).unwrap());

        let fault: Response = Err(Fault {
            code: -32500,
            msg: "Session expired".to_string(),
        });
        let xml = String::from_utf8(write_method_response(&fault)).unwrap();
        assert_eq!(fault, read_method_response(&xml).unwrap());
    }
}
