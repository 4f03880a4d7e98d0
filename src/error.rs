use quick_error::*;
use url::ParseError;

use crate::transport::TransportError;

quick_error! {
    /// Types of errors a WAMP client can encounter
    #[derive(Debug)]
    pub enum WampError {
        UnknownError(e: String) {
            from()
            display("Unhandled error : {}", e)
        }
        /// Error with the connection
        ConnectionError(e: TransportError) {
            from()
            source(e)
            display("An error occured with the connection: ({})", e)
        }
        /// WAMP uri is invalid
        InvalidUri(e: ParseError) {
            source(e)
            display("The uri provided could not be parsed: {}", e)
        }
        /// Server uri is invalid
        NoHostInUri {
            display("The uri provided did not contain a host address")
        }
        /// A peer violated the WAMP protocol grammar or state machine
        ProtocolViolation(e: String) {
            display("The WAMP protocol was violated: {}", e)
        }
        /// The session was aborted (locally or by the router) while an
        /// operation was still outstanding
        SessionAborted(e: String) {
            display("The session was aborted: {}", e)
        }
        /// The client has been dropped while the event loop was running
        ClientDied {
            display("The client has exited without sending Shutdown")
        }
    }
}
