use serde::de::DeserializeOwned;

use crate::api::Callback;
use crate::xml::{from_value, Call, Value};

/// Matches calls by their method name to their respective `Callback` variant.
///
/// Selectively ignores callbacks that we don't use.
/// Logs a warning for callbacks with unexpected parameters.
pub fn read_callback(call: &Call) -> Option<Callback> {
    log::debug!("callback: {:?}", call);
    if call.name == "ManiaPlanet.ModeScriptCallbackArray" {
        read_script_callback(call)
    } else {
        read_regular_callback(call)
    }
}

const USED_CALLBACKS: [&str; 4] = [
    "ManiaPlanet.PlayerConnect",
    "ManiaPlanet.PlayerDisconnect",
    "ManiaPlanet.BeginMap",
    "ManiaPlanet.EndMap",
];

fn read_regular_callback(call: &Call) -> Option<Callback> {
    use Callback::*;
    use Value::*;

    let cb = match (call.name.as_ref(), &call.args[..]) {
        ("ManiaPlanet.PlayerConnect", [String(login), is_spectator]) => PlayerConnect {
            login: login.clone(),
            is_spectator: is_spectator.as_bool()?,
        },
        ("ManiaPlanet.PlayerDisconnect", [String(login), ..]) => PlayerDisconnect {
            login: login.clone(),
        },
        ("ManiaPlanet.BeginMap", [map]) => MapBegin {
            map: de_value(call, map)?,
        },
        ("ManiaPlanet.EndMap", [map]) => MapEnd {
            map: de_value(call, map)?,
        },
        (name, _) if USED_CALLBACKS.contains(&name) => {
            log::warn!("unexpected signature for {:?}", call);
            return None;
        }
        _ => {
            // ignore without logging
            return None;
        }
    };
    Some(cb)
}

fn read_script_callback(call: &Call) -> Option<Callback> {
    use Value::*;

    let (cb_name, json_args) = match &call.args[..] {
        [String(cb_name), Array(json_args)] => (cb_name, json_args),
        _ => {
            log::warn!("unexpected signature for {:?}", call);
            return None;
        }
    };

    match cb_name.as_ref() {
        "Trackmania.Event.WayPoint" => {
            let json = json_args.first().and_then(Value::as_str)?;
            let event = de_json(cb_name, json)?;
            Some(Callback::RunCheckpoint { event })
        }
        _ => None,
    }
}

fn de_value<T>(call: &Call, value: &Value) -> Option<T>
where
    T: DeserializeOwned,
{
    from_value(value)
        .map_err(|err| log::warn!("unexpected args for {}: {}", call.name, err))
        .ok()
}

/// All arguments of script callbacks are JSON strings.
fn de_json<T>(cb_name: &str, json: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str(json)
        .map_err(|err| log::warn!("unexpected args for {}: {}", cb_name, err))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CheckpointEvent;

    fn map_value() -> Value {
        vec![
            ("UId", Value::from("uid")),
            ("Name", Value::from("A01")),
            ("FileName", Value::from("A01.Map.Gbx")),
            ("Author", Value::from("nadeo")),
            ("Environnement", Value::from("Stadium")),
            ("NbCheckpoints", Value::from(3)),
            ("NbLaps", Value::from(-1)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn player_connect() {
        let call = Call::new(
            "ManiaPlanet.PlayerConnect",
            vec![Value::from("tim"), Value::from(true)],
        );
        assert_eq!(
            Some(Callback::PlayerConnect {
                login: "tim".to_string(),
                is_spectator: true
            }),
            read_callback(&call)
        );
    }

    #[test]
    fn map_begin_and_end() {
        let call = Call::new("ManiaPlanet.BeginMap", vec![map_value()]);
        match read_callback(&call) {
            Some(Callback::MapBegin { map }) => assert_eq!(3, map.nb_checkpoints),
            other => panic!("unexpected {:?}", other),
        }
        let call = Call::new("ManiaPlanet.EndMap", vec![map_value()]);
        assert!(matches!(read_callback(&call), Some(Callback::MapEnd { .. })));
    }

    #[test]
    fn waypoint() {
        let json = r#"{
            "time": 123456,
            "login": "tim",
            "racetime": 31337,
            "laptime": 31337,
            "checkpointinrace": 2,
            "curracecheckpoints": [10000, 20000, 31337],
            "isendrace": true,
            "speed": 301.5
        }"#;
        let call = Call::new(
            "ManiaPlanet.ModeScriptCallbackArray",
            vec![
                Value::from("Trackmania.Event.WayPoint"),
                Value::Array(vec![Value::from(json)]),
            ],
        );
        let expected = CheckpointEvent {
            player_login: "tim".to_string(),
            race_time_millis: 31337,
            race_time_cp_millis: vec![10000, 20000, 31337],
            cp_index: 2,
            is_finish: true,
        };
        assert_eq!(
            Some(Callback::RunCheckpoint { event: expected }),
            read_callback(&call)
        );
    }

    #[test]
    fn ignore_unused_and_malformed() {
        let call = Call::new("ManiaPlanet.PlayerChat", vec![Value::from(0)]);
        assert_eq!(None, read_callback(&call));

        let call = Call::new("ManiaPlanet.BeginMap", vec![Value::from("nope")]);
        assert_eq!(None, read_callback(&call));

        let call = Call::new(
            "ManiaPlanet.ModeScriptCallbackArray",
            vec![
                Value::from("Trackmania.Event.WayPoint"),
                Value::Array(vec![Value::from("{not json")]),
            ],
        );
        assert_eq!(None, read_callback(&call));
    }
}
