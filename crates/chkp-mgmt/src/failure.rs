//! Classification of server failure bodies.
//!
//! The server reports many distinct conditions under the same generic codes, so some kinds can
//! only be told apart by substrings of the human message. Those matches are fragile across
//! server versions; callers needing strict guarantees should also inspect the message of an
//! unclassified [`Error::Api`].

use chkp_core::{Error, FailureResponse};

/// Code used when an object is locked by another session.
pub const OBJECT_LOCKED_CODE: &str = "generic_err_object_locked";
/// Catch-all code used for many unrelated failures.
pub const GENERIC_ERROR_CODE: &str = "generic_error";
/// Code used for validation failures, including duplicate names and addresses.
pub const VALIDATION_FAILED_CODE: &str = "err_validation_failed";
/// Code used when the requested object does not exist.
pub const OBJECT_NOT_FOUND_CODE: &str = "generic_err_object_not_found";

const LOCKED_MARKER: &str = "is locked by another session.";
const NAME_EXISTS_MARKER: &str = "More than one object named";
const IP_EXISTS_MARKER: &str = "Multiple objects have the same IP address ";
const SESSION_LIMIT_MARKER: &str = "sk113955";

/// Map a decoded failure onto an error kind.
///
/// Rules are evaluated in a fixed order and the first match wins: object locked, duplicate
/// name, duplicate IP address, object not found. Anything else is returned unchanged as
/// [`Error::Api`].
#[must_use]
pub fn classify(failure: FailureResponse) -> Error {
    if is_object_locked(&failure) {
        return Error::ObjectLocked(failure.message);
    }

    if is_object_name_exists(&failure) {
        return Error::ObjectNameExists(failure.message);
    }

    if is_ip_address_exists(&failure) {
        return Error::IpAddressExists(failure.message);
    }

    if is_object_not_found(&failure) {
        return Error::ObjectNotFound(failure.message);
    }

    Error::Api(Box::new(failure))
}

/// Decode a non-success body and classify it.
///
/// The HTTP status is attached to the failure only after classification, so an unclassified
/// [`Error::Api`] carries it for inspection while the status-zero rules still apply to what
/// the server sent. A body that is not a failure payload becomes [`Error::ParseError`].
#[must_use]
pub fn parse_failure(body: &str, status: u16) -> Error {
    let failure: FailureResponse = match serde_json::from_str(body) {
        Ok(failure) => failure,
        Err(err) => {
            return Error::ParseError(format!("can not parse error (HTTP {status}): {err}"));
        }
    };

    match classify(failure) {
        Error::Api(mut failure) => {
            failure.status_code = status;
            Error::Api(failure)
        }
        classified => classified,
    }
}

fn is_object_locked(failure: &FailureResponse) -> bool {
    failure.code == OBJECT_LOCKED_CODE
        || (failure.code == GENERIC_ERROR_CODE && failure.message.contains(LOCKED_MARKER))
}

fn is_object_name_exists(failure: &FailureResponse) -> bool {
    failure.code == VALIDATION_FAILED_CODE
        && failure.status_code == 0
        && failure.message.contains(NAME_EXISTS_MARKER)
}

fn is_ip_address_exists(failure: &FailureResponse) -> bool {
    failure.code == VALIDATION_FAILED_CODE
        && failure.status_code == 0
        && failure.message.contains(IP_EXISTS_MARKER)
}

fn is_object_not_found(failure: &FailureResponse) -> bool {
    failure.code == OBJECT_NOT_FOUND_CODE && failure.status_code == 0
}

/// Returns true when the server refused a login because its session limit was reached.
///
/// Not consulted by [`classify`]: such failures still surface as [`Error::Api`]. Whether they
/// deserve their own retryable kind is undecided.
#[must_use]
pub fn is_session_limit_reached(failure: &FailureResponse) -> bool {
    failure.message.contains(SESSION_LIMIT_MARKER)
}
