//! The WAMP message grammar and its JSON array codec.
//!
//! Every message is a JSON array whose first element is an integer message
//! type code; the remaining elements are positional. `args`/`argsKw` are
//! independently optional trailing elements.

use serde_json::{Map, Value};

pub type WampId = u64;
pub type WampUri = String;
pub type WampDict = Map<String, Value>;
pub type WampList = Vec<Value>;
pub type WampArgs = WampList;
pub type WampKwArgs = WampDict;

pub mod msg_type {
    pub const HELLO: u64 = 1;
    pub const WELCOME: u64 = 2;
    pub const ABORT: u64 = 3;
    pub const GOODBYE: u64 = 6;
    pub const ERROR: u64 = 8;
    pub const PUBLISH: u64 = 16;
    pub const PUBLISHED: u64 = 17;
    pub const SUBSCRIBE: u64 = 32;
    pub const SUBSCRIBED: u64 = 33;
    pub const UNSUBSCRIBE: u64 = 34;
    pub const UNSUBSCRIBED: u64 = 35;
    pub const EVENT: u64 = 36;
    pub const CALL: u64 = 48;
    pub const RESULT: u64 = 50;
    pub const REGISTER: u64 = 64;
    pub const REGISTERED: u64 = 65;
    pub const UNREGISTER: u64 = 66;
    pub const UNREGISTERED: u64 = 67;
    pub const INVOCATION: u64 = 68;
    pub const YIELD: u64 = 70;
}

/// The 19 WAMP message variants this client implements.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Hello {
        realm: WampUri,
        details: WampDict,
    },
    Welcome {
        session: WampId,
        details: WampDict,
    },
    Abort {
        details: WampDict,
        reason: WampUri,
    },
    Goodbye {
        details: WampDict,
        reason: WampUri,
    },
    Error {
        orig_type: u64,
        request: WampId,
        details: WampDict,
        error: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Publish {
        request: WampId,
        options: WampDict,
        topic: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Published {
        request: WampId,
        publication: WampId,
    },
    Subscribe {
        request: WampId,
        options: WampDict,
        topic: WampUri,
    },
    Subscribed {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribe {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribed {
        request: WampId,
    },
    Event {
        subscription: WampId,
        publication: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Call {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Result {
        request: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Register {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
    },
    Registered {
        request: WampId,
        registration: WampId,
    },
    Unregister {
        request: WampId,
        registration: WampId,
    },
    Unregistered {
        request: WampId,
    },
    Invocation {
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Yield {
        request: WampId,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
}

impl Msg {
    pub fn message_type(&self) -> u64 {
        match self {
            Msg::Hello { .. } => msg_type::HELLO,
            Msg::Welcome { .. } => msg_type::WELCOME,
            Msg::Abort { .. } => msg_type::ABORT,
            Msg::Goodbye { .. } => msg_type::GOODBYE,
            Msg::Error { .. } => msg_type::ERROR,
            Msg::Publish { .. } => msg_type::PUBLISH,
            Msg::Published { .. } => msg_type::PUBLISHED,
            Msg::Subscribe { .. } => msg_type::SUBSCRIBE,
            Msg::Subscribed { .. } => msg_type::SUBSCRIBED,
            Msg::Unsubscribe { .. } => msg_type::UNSUBSCRIBE,
            Msg::Unsubscribed { .. } => msg_type::UNSUBSCRIBED,
            Msg::Event { .. } => msg_type::EVENT,
            Msg::Call { .. } => msg_type::CALL,
            Msg::Result { .. } => msg_type::RESULT,
            Msg::Register { .. } => msg_type::REGISTER,
            Msg::Registered { .. } => msg_type::REGISTERED,
            Msg::Unregister { .. } => msg_type::UNREGISTER,
            Msg::Unregistered { .. } => msg_type::UNREGISTERED,
            Msg::Invocation { .. } => msg_type::INVOCATION,
            Msg::Yield { .. } => msg_type::YIELD,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Msg::Hello { .. } => "HELLO",
            Msg::Welcome { .. } => "WELCOME",
            Msg::Abort { .. } => "ABORT",
            Msg::Goodbye { .. } => "GOODBYE",
            Msg::Error { .. } => "ERROR",
            Msg::Publish { .. } => "PUBLISH",
            Msg::Published { .. } => "PUBLISHED",
            Msg::Subscribe { .. } => "SUBSCRIBE",
            Msg::Subscribed { .. } => "SUBSCRIBED",
            Msg::Unsubscribe { .. } => "UNSUBSCRIBE",
            Msg::Unsubscribed { .. } => "UNSUBSCRIBED",
            Msg::Event { .. } => "EVENT",
            Msg::Call { .. } => "CALL",
            Msg::Result { .. } => "RESULT",
            Msg::Register { .. } => "REGISTER",
            Msg::Registered { .. } => "REGISTERED",
            Msg::Unregister { .. } => "UNREGISTER",
            Msg::Unregistered { .. } => "UNREGISTERED",
            Msg::Invocation { .. } => "INVOCATION",
            Msg::Yield { .. } => "YIELD",
        }
    }
}

/// Why a decoded frame could not be turned into a [`Msg`].
#[derive(Debug, Clone)]
pub enum InvalidMessage {
    /// The text was not a JSON array, or a known message type's array did
    /// not have the shape its grammar requires.
    Parse { text: String, reason: String },
    /// The first array element was an integer but not one of the 19 known
    /// message type codes.
    UnknownType { text: String, code: i64 },
}

impl std::fmt::Display for InvalidMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidMessage::Parse { reason, .. } => write!(f, "invalid WAMP message: {}", reason),
            InvalidMessage::UnknownType { code, .. } => {
                write!(f, "unknown WAMP message type: {}", code)
            }
        }
    }
}
impl std::error::Error for InvalidMessage {}

/// Appends the `args`/`argsKw` trailing elements per the synthesis rule:
/// an absent `args` with a present `argsKw` is encoded as an empty array.
fn push_args(arr: &mut Vec<Value>, arguments: &Option<WampArgs>, arguments_kw: &Option<WampKwArgs>) {
    match (arguments, arguments_kw) {
        (None, None) => {}
        (Some(a), None) => arr.push(Value::Array(a.clone())),
        (None, Some(kw)) => {
            arr.push(Value::Array(Vec::new()));
            arr.push(Value::Object(kw.clone()));
        }
        (Some(a), Some(kw)) => {
            arr.push(Value::Array(a.clone()));
            arr.push(Value::Object(kw.clone()));
        }
    }
}

/// Encodes a message to its compact JSON array text. Deterministic: field
/// order always follows the grammar's positional layout.
pub fn encode(msg: &Msg) -> String {
    let mut arr: Vec<Value> = vec![Value::from(msg.message_type())];

    match msg {
        Msg::Hello { realm, details } => {
            arr.push(Value::String(realm.clone()));
            arr.push(Value::Object(details.clone()));
        }
        Msg::Welcome { session, details } => {
            arr.push(Value::from(*session));
            arr.push(Value::Object(details.clone()));
        }
        Msg::Abort { details, reason } => {
            arr.push(Value::Object(details.clone()));
            arr.push(Value::String(reason.clone()));
        }
        Msg::Goodbye { details, reason } => {
            arr.push(Value::Object(details.clone()));
            arr.push(Value::String(reason.clone()));
        }
        Msg::Error {
            orig_type,
            request,
            details,
            error,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*orig_type));
            arr.push(Value::from(*request));
            arr.push(Value::Object(details.clone()));
            arr.push(Value::String(error.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Publish {
            request,
            options,
            topic,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(options.clone()));
            arr.push(Value::String(topic.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Published {
            request,
            publication,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*publication));
        }
        Msg::Subscribe {
            request,
            options,
            topic,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(options.clone()));
            arr.push(Value::String(topic.clone()));
        }
        Msg::Subscribed {
            request,
            subscription,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*subscription));
        }
        Msg::Unsubscribe {
            request,
            subscription,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*subscription));
        }
        Msg::Unsubscribed { request } => {
            arr.push(Value::from(*request));
        }
        Msg::Event {
            subscription,
            publication,
            details,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*subscription));
            arr.push(Value::from(*publication));
            arr.push(Value::Object(details.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Call {
            request,
            options,
            procedure,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(options.clone()));
            arr.push(Value::String(procedure.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Result {
            request,
            details,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(details.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Register {
            request,
            options,
            procedure,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(options.clone()));
            arr.push(Value::String(procedure.clone()));
        }
        Msg::Registered {
            request,
            registration,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*registration));
        }
        Msg::Unregister {
            request,
            registration,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*registration));
        }
        Msg::Unregistered { request } => {
            arr.push(Value::from(*request));
        }
        Msg::Invocation {
            request,
            registration,
            details,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::from(*registration));
            arr.push(Value::Object(details.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
        Msg::Yield {
            request,
            options,
            arguments,
            arguments_kw,
        } => {
            arr.push(Value::from(*request));
            arr.push(Value::Object(options.clone()));
            push_args(&mut arr, arguments, arguments_kw);
        }
    }

    // serde_json::to_string never emits whitespace for compact values.
    serde_json::to_string(&Value::Array(arr)).expect("a Value tree is always serializable")
}

/// Decodes a single JSON-array text frame into a [`Msg`], or describes why
/// it could not be decoded.
pub fn decode(text: &str) -> Result<Msg, InvalidMessage> {
    let value: Value = serde_json::from_str(text).map_err(|e| InvalidMessage::Parse {
        text: text.to_string(),
        reason: e.to_string(),
    })?;

    let arr = match value {
        Value::Array(a) if !a.is_empty() => a,
        _ => {
            return Err(InvalidMessage::Parse {
                text: text.to_string(),
                reason: "expected a non-empty JSON array".to_string(),
            })
        }
    };

    let code = match arr[0].as_i64() {
        Some(c) => c,
        None => {
            return Err(InvalidMessage::Parse {
                text: text.to_string(),
                reason: "first array element must be an integer message type".to_string(),
            })
        }
    };

    let malformed = |reason: &str| InvalidMessage::Parse {
        text: text.to_string(),
        reason: format!("{} ({} message)", reason, code),
    };

    let get_u64 = |v: &Value| -> Option<u64> { v.as_u64() };
    let get_str = |v: &Value| -> Option<String> { v.as_str().map(|s| s.to_string()) };
    let get_dict = |v: &Value| -> Option<WampDict> {
        match v {
            Value::Object(m) => Some(m.clone()),
            _ => None,
        }
    };
    let get_args = |arr: &[Value], idx: usize| -> Option<WampArgs> {
        match arr.get(idx) {
            Some(Value::Array(a)) => Some(a.clone()),
            _ => None,
        }
    };
    let get_kwargs = |arr: &[Value], idx: usize| -> Option<WampKwArgs> {
        match arr.get(idx) {
            Some(Value::Object(m)) => Some(m.clone()),
            _ => None,
        }
    };

    let code_u64 = code as u64;
    let msg = match code_u64 {
        msg_type::HELLO if arr.len() >= 3 => Msg::Hello {
            realm: get_str(&arr[1]).ok_or_else(|| malformed("realm must be a string"))?,
            details: get_dict(&arr[2]).ok_or_else(|| malformed("details must be an object"))?,
        },
        msg_type::WELCOME if arr.len() >= 3 => Msg::Welcome {
            session: get_u64(&arr[1]).ok_or_else(|| malformed("session must be an id"))?,
            details: get_dict(&arr[2]).ok_or_else(|| malformed("details must be an object"))?,
        },
        msg_type::ABORT if arr.len() >= 3 => Msg::Abort {
            details: get_dict(&arr[1]).ok_or_else(|| malformed("details must be an object"))?,
            reason: get_str(&arr[2]).ok_or_else(|| malformed("reason must be a string"))?,
        },
        msg_type::GOODBYE if arr.len() >= 3 => Msg::Goodbye {
            details: get_dict(&arr[1]).ok_or_else(|| malformed("details must be an object"))?,
            reason: get_str(&arr[2]).ok_or_else(|| malformed("reason must be a string"))?,
        },
        msg_type::ERROR if arr.len() >= 5 => Msg::Error {
            orig_type: get_u64(&arr[1]).ok_or_else(|| malformed("origType must be an id"))?,
            request: get_u64(&arr[2]).ok_or_else(|| malformed("request must be an id"))?,
            details: get_dict(&arr[3]).ok_or_else(|| malformed("details must be an object"))?,
            error: get_str(&arr[4]).ok_or_else(|| malformed("error must be a string"))?,
            arguments: get_args(&arr, 5),
            arguments_kw: get_kwargs(&arr, 6),
        },
        msg_type::PUBLISH if arr.len() >= 4 => Msg::Publish {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            options: get_dict(&arr[2]).ok_or_else(|| malformed("options must be an object"))?,
            topic: get_str(&arr[3]).ok_or_else(|| malformed("topic must be a string"))?,
            arguments: get_args(&arr, 4),
            arguments_kw: get_kwargs(&arr, 5),
        },
        msg_type::PUBLISHED if arr.len() >= 3 => Msg::Published {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            publication: get_u64(&arr[2]).ok_or_else(|| malformed("publication must be an id"))?,
        },
        msg_type::SUBSCRIBE if arr.len() >= 4 => Msg::Subscribe {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            options: get_dict(&arr[2]).ok_or_else(|| malformed("options must be an object"))?,
            topic: get_str(&arr[3]).ok_or_else(|| malformed("topic must be a string"))?,
        },
        msg_type::SUBSCRIBED if arr.len() >= 3 => Msg::Subscribed {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            subscription: get_u64(&arr[2]).ok_or_else(|| malformed("subscription must be an id"))?,
        },
        msg_type::UNSUBSCRIBE if arr.len() >= 3 => Msg::Unsubscribe {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            subscription: get_u64(&arr[2]).ok_or_else(|| malformed("subscription must be an id"))?,
        },
        msg_type::UNSUBSCRIBED if arr.len() >= 2 => Msg::Unsubscribed {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
        },
        msg_type::EVENT if arr.len() >= 4 => Msg::Event {
            subscription: get_u64(&arr[1]).ok_or_else(|| malformed("subscription must be an id"))?,
            publication: get_u64(&arr[2]).ok_or_else(|| malformed("publication must be an id"))?,
            details: get_dict(&arr[3]).ok_or_else(|| malformed("details must be an object"))?,
            arguments: get_args(&arr, 4),
            arguments_kw: get_kwargs(&arr, 5),
        },
        msg_type::CALL if arr.len() >= 4 => Msg::Call {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            options: get_dict(&arr[2]).ok_or_else(|| malformed("options must be an object"))?,
            procedure: get_str(&arr[3]).ok_or_else(|| malformed("procedure must be a string"))?,
            arguments: get_args(&arr, 4),
            arguments_kw: get_kwargs(&arr, 5),
        },
        msg_type::RESULT if arr.len() >= 3 => Msg::Result {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            details: get_dict(&arr[2]).ok_or_else(|| malformed("details must be an object"))?,
            arguments: get_args(&arr, 3),
            arguments_kw: get_kwargs(&arr, 4),
        },
        msg_type::REGISTER if arr.len() >= 4 => Msg::Register {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            options: get_dict(&arr[2]).ok_or_else(|| malformed("options must be an object"))?,
            procedure: get_str(&arr[3]).ok_or_else(|| malformed("procedure must be a string"))?,
        },
        msg_type::REGISTERED if arr.len() >= 3 => Msg::Registered {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            registration: get_u64(&arr[2]).ok_or_else(|| malformed("registration must be an id"))?,
        },
        msg_type::UNREGISTER if arr.len() >= 3 => Msg::Unregister {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            registration: get_u64(&arr[2]).ok_or_else(|| malformed("registration must be an id"))?,
        },
        msg_type::UNREGISTERED if arr.len() >= 2 => Msg::Unregistered {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
        },
        msg_type::INVOCATION if arr.len() >= 4 => Msg::Invocation {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            registration: get_u64(&arr[2]).ok_or_else(|| malformed("registration must be an id"))?,
            details: get_dict(&arr[3]).ok_or_else(|| malformed("details must be an object"))?,
            arguments: get_args(&arr, 4),
            arguments_kw: get_kwargs(&arr, 5),
        },
        msg_type::YIELD if arr.len() >= 3 => Msg::Yield {
            request: get_u64(&arr[1]).ok_or_else(|| malformed("request must be an id"))?,
            options: get_dict(&arr[2]).ok_or_else(|| malformed("options must be an object"))?,
            arguments: get_args(&arr, 3),
            arguments_kw: get_kwargs(&arr, 4),
        },
        msg_type::HELLO
        | msg_type::WELCOME
        | msg_type::ABORT
        | msg_type::GOODBYE
        | msg_type::ERROR
        | msg_type::PUBLISH
        | msg_type::PUBLISHED
        | msg_type::SUBSCRIBE
        | msg_type::SUBSCRIBED
        | msg_type::UNSUBSCRIBE
        | msg_type::UNSUBSCRIBED
        | msg_type::EVENT
        | msg_type::CALL
        | msg_type::RESULT
        | msg_type::REGISTER
        | msg_type::REGISTERED
        | msg_type::UNREGISTER
        | msg_type::UNREGISTERED
        | msg_type::INVOCATION
        | msg_type::YIELD => {
            return Err(malformed("array too short for this message type"));
        }
        _ => {
            return Err(InvalidMessage::UnknownType {
                text: text.to_string(),
                code,
            })
        }
    };

    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dict(v: Value) -> WampDict {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn round_trips_hello() {
        let m = Msg::Hello {
            realm: "somerealm".to_string(),
            details: dict(json!({"roles": {"publisher": {}}})),
        };
        let text = encode(&m);
        assert_eq!(decode(&text).unwrap(), m);
    }

    #[test]
    fn round_trips_event_with_args_and_kwargs() {
        let m = Msg::Event {
            subscription: 5512315355,
            publication: 4429313566,
            details: WampDict::new(),
            arguments: Some(vec![]),
            arguments_kw: Some(dict(json!({"color": "orange", "sizes": [23, 42, 7]}))),
        };
        let text = encode(&m);
        assert_eq!(decode(&text).unwrap(), m);
    }

    #[test]
    fn absent_args_with_present_kwargs_round_trips_to_empty_args() {
        let m = Msg::Yield {
            request: 6131533,
            options: WampDict::new(),
            arguments: None,
            arguments_kw: Some(dict(json!({"userid": 123, "karma": 10}))),
        };
        let text = encode(&m);
        let decoded = decode(&text).unwrap();
        match decoded {
            Msg::Yield {
                arguments,
                arguments_kw,
                ..
            } => {
                assert_eq!(arguments, Some(vec![]));
                assert_eq!(arguments_kw, Some(dict(json!({"userid": 123, "karma": 10}))));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn encode_is_compact_with_no_whitespace() {
        let m = Msg::Unsubscribed { request: 85346237 };
        assert_eq!(encode(&m), "[35,85346237]");
    }

    #[test]
    fn scenario_payloads_match_literally() {
        let hello = Msg::Hello {
            realm: "somerealm".to_string(),
            details: dict(json!({
                "roles": {"publisher": {}, "subscriber": {}, "caller": {}, "callee": {}}
            })),
        };
        assert_eq!(
            serde_json::from_str::<Value>(&encode(&hello)).unwrap(),
            serde_json::from_str::<Value>(
                r#"[1,"somerealm",{"roles":{"publisher":{},"subscriber":{},"caller":{},"callee":{}}}]"#
            )
            .unwrap()
        );

        let subscribe = Msg::Subscribe {
            request: 713845233,
            options: WampDict::new(),
            topic: "com.myapp.mytopic1".to_string(),
        };
        assert_eq!(encode(&subscribe), r#"[32,713845233,{},"com.myapp.mytopic1"]"#);
    }

    #[test]
    fn decode_rejects_non_array_with_parse_error() {
        match decode(r#"{"not":"an array"}"#) {
            Err(InvalidMessage::Parse { .. }) => {}
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_garbage_json_with_parse_error() {
        match decode("not json at all") {
            Err(InvalidMessage::Parse { .. }) => {}
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_unknown_type_code() {
        match decode("[9999,1,2,3]") {
            Err(InvalidMessage::UnknownType { code, .. }) => assert_eq!(code, 9999),
            other => panic!("expected UnknownType error, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_truncated_known_type() {
        match decode("[32,1]") {
            Err(InvalidMessage::Parse { .. }) => {}
            other => panic!("expected Parse error, got {:?}", other),
        }
    }
}
