// Human-readable messages for RPC failure codes.
//
// Codes are looked up by method first, then by service, then in the table
// shared by every service. Keys must match the service/method names used by
// the endpoint modules; nothing enforces that at compile time.

use crate::outcome::{ResponseMeta, RpcOutcome};

const DEFAULT_MESSAGE: &str = "Unknown error.";

const COMMON: &[(i64, &str)] = &[
    (100, "Unknown error"),
    (101, "Invalid parameter"),
    (102, "The requested API does not exist"),
    (103, "The requested method does not exist"),
    (104, "The requested version does not support this functionality"),
    (105, "The logged in session does not have permission"),
    (106, "Session timeout"),
    (107, "Session interrupted by duplicate login"),
    (119, "SID not found"),
    (401, "Not authorized"),
    (403, "Permission denied"),
    (404, "Not found"),
    (5001, "Session not authenticated"),
    (5002, "Session expired"),
];

const SESSION: &[(i64, &str)] = &[
    (400, "No such username or incorrect password"),
    (401, "Account disabled"),
    (402, "Permission denied"),
    (403, "2-step verification needed"),
    (404, "2-step verification failed"),
];

const DOWNLOADER: &[(i64, &str)] = &[
    (400, "File upload failed"),
    (401, "Max number of tasks reached"),
    (402, "Destination denied"),
    (403, "Destination does not exist"),
    (404, "Invalid task ID"),
    (405, "Invalid task action"),
    (406, "No default destination is set for this user"),
    (407, "Set destination failed"),
    (408, "File does not exist"),
];

const SHARE_MGMT: &[(i64, &str)] = &[
    (160, "The logged in session does not have permission"),
    (400, "Invalid parameter of file operation"),
    (401, "Unknown error of file operation"),
    (402, "System is too busy"),
    (407, "Operation not permitted"),
    (408, "No such file or directory"),
    (414, "File already exists"),
    (415, "Disk quota exceeded"),
    (416, "No space left on device"),
    (417, "Input/output error"),
    (418, "Illegal name or path"),
    (421, "Device or resource busy"),
];

fn table(key: &str) -> Option<&'static [(i64, &'static str)]> {
    match key {
        "session" | "session.login" | "session.logout" => Some(SESSION),
        "Downloader" => Some(DOWNLOADER),
        "ShareMgmt" => Some(SHARE_MGMT),
        _ => None,
    }
}

fn lookup(key: &str, code: i64) -> Option<&'static str> {
    table(key)?
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, msg)| *msg)
}

/// Message for a failed RPC, falling back to `default`.
pub fn describe_failure_or(meta: &ResponseMeta, code: i64, default: &'static str) -> &'static str {
    lookup(&format!("{}.{}", meta.service, meta.method), code)
        .or_else(|| lookup(&meta.service, code))
        .or_else(|| {
            COMMON
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, msg)| *msg)
        })
        .unwrap_or(default)
}

/// Message for a failed RPC.
pub fn describe_failure(meta: &ResponseMeta, code: i64) -> &'static str {
    describe_failure_or(meta, code, DEFAULT_MESSAGE)
}

/// One-line description of any non-success outcome, `None` on success.
pub fn describe_outcome<T>(outcome: &RpcOutcome<T>) -> Option<String> {
    match outcome {
        RpcOutcome::Success { .. } => None,
        RpcOutcome::Failure { code, meta, .. } => Some(describe_failure(meta, *code).to_owned()),
        RpcOutcome::ConnectionFailure(failure) => Some(failure.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_table_wins_over_common() {
        let meta = ResponseMeta::new("session", "login");
        assert_eq!(
            describe_failure(&meta, 400),
            "No such username or incorrect password"
        );
    }

    #[test]
    fn falls_back_to_common_then_default() {
        let meta = ResponseMeta::new("Downloader", "getDownloadList");
        assert_eq!(describe_failure(&meta, 106), "Session timeout");
        assert_eq!(describe_failure(&meta, 9999), DEFAULT_MESSAGE);
    }
}
