use log::*;

/// Returns whether a uri is valid or not (using strict rules)
pub fn is_valid_strict_uri<T: AsRef<str>>(in_uri: T) -> bool {
    let uri: &str = in_uri.as_ref();
    let mut num_chars_token: usize = 0;
    if uri.starts_with("wamp.") {
        warn!("URI '{}' cannot start with 'wamp'", uri);
        return false;
    }

    for (i, c) in uri.chars().enumerate() {
        if c == '.' {
            if num_chars_token == 0 {
                warn!("URI '{}' contains a zero length token ending @ index {}", uri, i);
                return false;
            }
            num_chars_token = 0;
        } else {
            num_chars_token += 1;
        }

        if c == '_' {
            continue;
        }

        if !c.is_lowercase() {
            warn!("URI '{}' contains a non lower case character @ index {}", uri, i);
            return false;
        }
        if !c.is_alphanumeric() {
            warn!("URI '{}' contains an invalid character @ index {}", uri, i);
            return false;
        }
    }

    true
}

/// A role the client advertises in its HELLO message
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClientRole {
    Publisher,
    Subscriber,
    Caller,
    Callee,
}

impl ClientRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            ClientRole::Publisher => "publisher",
            ClientRole::Subscriber => "subscriber",
            ClientRole::Caller => "caller",
            ClientRole::Callee => "callee",
        }
    }
}

/// WebSocket close codes used by the session when closing the transport
pub mod close_code {
    pub const NORMAL_CLOSURE: u16 = 1000;
    pub const PROTOCOL_ERROR: u16 = 1002;
}

/// WAMP-layer GOODBYE/ABORT reason URIs
pub mod close_reason {
    pub const SYSTEM_SHUTDOWN: &str = "wamp.close.system_shutdown";
    pub const CLOSE_REALM: &str = "wamp.close.close_realm";
    pub const GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";
    pub const PROTOCOL_VIOLATION: &str = "wamp.error.protocol_violation";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_uris() {
        assert!(is_valid_strict_uri("com.myapp.mytopic1"));
        assert!(is_valid_strict_uri("com.myapp.my_topic"));
    }

    #[test]
    fn rejects_wamp_prefixed_uris() {
        assert!(!is_valid_strict_uri("wamp.close.close_realm"));
    }

    #[test]
    fn rejects_empty_tokens_and_uppercase() {
        assert!(!is_valid_strict_uri("com..mytopic"));
        assert!(!is_valid_strict_uri("com.MyApp.mytopic"));
    }
}
