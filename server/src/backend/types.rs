//! Backend Operation Types
//!
//! Typed arguments for every operation reachable through the action table,
//! plus the uniform response envelope returned to HTTP callers.

use serde::Serialize;
use serde_json::Value;

/// Retcode used when request parameters cannot form a valid call.
pub const RETCODE_BAD_PARAMS: i32 = 100;

/// Retcode used when the backend has no live session.
pub const RETCODE_OFFLINE: i32 = 102;

/// Retcode used for unknown actions.
pub const RETCODE_UNKNOWN_ACTION: i32 = 404;

/// Retcode used when the rate limiter rejects a dispatch.
pub const RETCODE_RATE_LIMITED: i32 = 429;

/// Message content as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text, possibly containing inline CQ codes.
    Text(String),
    /// Structured message segments (a JSON array or object).
    Segments(Value),
}

/// One invocation of a backend operation with its parsed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    GetLoginInfo,
    GetFriendList,
    GetGroupList {
        no_cache: bool,
    },
    GetGroupInfo {
        group_id: i64,
    },
    GetGroupMemberList {
        group_id: i64,
        no_cache: bool,
    },
    GetGroupMemberInfo {
        group_id: i64,
        user_id: i64,
    },
    SendPrivateMessage {
        user_id: i64,
        message: MessageContent,
        auto_escape: bool,
    },
    SendGroupMessage {
        group_id: i64,
        message: MessageContent,
        auto_escape: bool,
    },
    SendGroupForwardMessage {
        group_id: i64,
        messages: Value,
    },
    DeleteMessage {
        message_id: i32,
    },
    ProcessFriendRequest {
        flag: String,
        approve: bool,
    },
    ProcessGroupRequest {
        flag: String,
        sub_type: String,
        reason: String,
        approve: bool,
    },
    SetGroupCard {
        group_id: i64,
        user_id: i64,
        card: String,
    },
    SetGroupSpecialTitle {
        group_id: i64,
        user_id: i64,
        special_title: String,
    },
    SetGroupKick {
        group_id: i64,
        user_id: i64,
        message: String,
    },
    SetGroupBan {
        group_id: i64,
        user_id: i64,
        duration: u32,
    },
    SetGroupWholeBan {
        group_id: i64,
        enable: bool,
    },
    SetGroupName {
        group_id: i64,
        group_name: String,
    },
    SetGroupAdmin {
        group_id: i64,
        user_id: i64,
        enable: bool,
    },
    SendGroupNotice {
        group_id: i64,
        content: String,
    },
    SetGroupLeave {
        group_id: i64,
    },
    GetImage {
        file: String,
    },
    GetForwardMessage {
        message_id: String,
    },
    GetGroupMessage {
        message_id: i32,
    },
    GetGroupHonorInfo {
        group_id: i64,
        honor_type: String,
    },
    CanSendImage,
    CanSendRecord,
    GetStatus,
    GetVersionInfo,
    ReloadEventFilter,
    GetVipInfo {
        user_id: i64,
    },
    GetStrangerInfo {
        user_id: i64,
    },
    SetGroupPortrait {
        group_id: i64,
        file: String,
        cache: String,
    },
    HandleQuickOperation {
        context: Value,
        operation: Value,
    },
    OcrImage {
        image: String,
    },
    GetWordSlices {
        content: String,
    },
}

/// Envelope status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Failed,
}

/// Uniform success/failure envelope returned for every dispatched action.
///
/// Callers must inspect `status`/`retcode`; the HTTP status is 200 either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub status: ResponseStatus,
    pub retcode: i32,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ActionResponse {
    /// Successful result carrying `data`.
    pub const fn ok(data: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            retcode: 0,
            data,
            msg: None,
        }
    }

    /// Failure with the given retcode and no data.
    pub const fn failed(retcode: i32) -> Self {
        Self {
            status: ResponseStatus::Failed,
            retcode,
            data: Value::Null,
            msg: None,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_envelope_shape() {
        let body = serde_json::to_value(ActionResponse::failed(RETCODE_UNKNOWN_ACTION)).unwrap();
        assert_eq!(
            body,
            json!({"status": "failed", "retcode": 404, "data": null})
        );
    }

    #[test]
    fn ok_envelope_with_message() {
        let resp = ActionResponse::ok(json!({"user_id": 1})).with_msg("done");
        assert!(resp.is_ok());
        let body = serde_json::to_value(resp).unwrap();
        assert_eq!(body["retcode"], 0);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["msg"], "done");
        assert_eq!(body["data"]["user_id"], 1);
    }
}
