//! Every request to the ranking service is a `system.multicall` that
//! pairs the actual call with the maintenance call, which reports
//! warnings for the calls of the batch.

use crate::constants::MAINTENANCE_METHOD;
use crate::dedimania::CallError;
use crate::network::TransportError;
use crate::server::xml::{fault_from, read_method_response, write_method_call, Response};
use crate::server::{Call, Value};

const MULTICALL: &str = "system.multicall";

/// Compose the request body for the given call.
pub fn encode(call: &Call) -> Vec<u8> {
    let maintenance = Call::new(MAINTENANCE_METHOD, vec![]);
    let batch = vec![batch_entry(call), batch_entry(&maintenance)];
    write_method_call(&Call::new(MULTICALL, vec![Value::Array(batch)]))
}

fn batch_entry(call: &Call) -> Value {
    vec![
        ("methodName", Value::from(call.name.as_str())),
        ("params", Value::Array(call.args.clone())),
    ]
    .into_iter()
    .collect()
}

/// Read the responses of a batch, in the order of its calls.
///
/// Returns `None` if the body is empty or cannot be parsed.
/// A fault of the whole batch is read as a single faulty response.
pub fn decode(raw: &[u8]) -> Option<Vec<Response>> {
    let text = std::str::from_utf8(raw)
        .map_err(|err| log::warn!("reply is not UTF-8: {}", err))
        .ok()?;
    if text.trim().is_empty() {
        log::warn!("empty reply");
        return None;
    }

    let elements = match read_method_response(text) {
        Ok(Ok(Value::Array(elements))) => elements,
        Ok(Ok(other)) => {
            log::warn!("expected multicall reply, got {:?}", other);
            return None;
        }
        Ok(Err(fault)) => return Some(vec![Err(fault)]),
        Err(err) => {
            log::warn!("cannot parse reply: {:#}", err);
            return None;
        }
    };

    Some(elements.into_iter().map(read_element).collect())
}

fn read_element(element: Value) -> Response {
    if element.member("faultCode").is_some() {
        return match fault_from(element.clone()) {
            Ok(fault) => Err(fault),
            Err(_) => Ok(element),
        };
    }
    match element {
        Value::Array(mut wrapped) if wrapped.len() == 1 => Ok(wrapped.remove(0)),
        other => Ok(other),
    }
}

/// Turn the outcome of a post into the return value of the actual call.
///
/// Warnings in the reply of the maintenance call are logged.
pub fn reply(outcome: Result<Vec<u8>, TransportError>) -> Result<Value, CallError> {
    let body = outcome?;
    let mut responses = decode(&body).ok_or(CallError::Unreadable)?.into_iter();

    let primary = responses.next().ok_or(CallError::Unreadable)?;
    match responses.next() {
        Some(Ok(maintenance)) => log_warnings(&maintenance),
        Some(Err(fault)) => log::warn!("maintenance call failed: {}", fault),
        None => {}
    }

    Ok(primary?)
}

fn log_warnings(maintenance: &Value) {
    let methods = maintenance
        .member("methods")
        .and_then(Value::as_array)
        .unwrap_or_default();

    for method in methods {
        let errors = method.member("errors").and_then(Value::as_str).unwrap_or("");
        if errors.is_empty() {
            continue;
        }
        let name = method
            .member("methodName")
            .and_then(Value::as_str)
            .unwrap_or("?");
        log::warn!("{}: {}", name, errors);
    }
}
