//! Action Dispatch Table
//!
//! Maps action names to handlers. A handler pulls the typed parameters it
//! needs from the [`RequestContext`] and builds exactly one backend
//! [`Action`]; the dispatcher then runs it and serializes the envelope.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use super::request::{Param, RequestContext};
use super::AppState;
use crate::backend::{
    Action, ActionResponse, MessageContent, RETCODE_BAD_PARAMS, RETCODE_RATE_LIMITED,
    RETCODE_UNKNOWN_ACTION,
};

/// Why a handler could not build a backend call.
#[derive(Debug)]
pub enum ActionRejection {
    /// Answer with a bare HTTP status.
    Http(ApiError),
    /// Answer 200 with a failure envelope.
    Failed(ActionResponse),
}

type Built = Result<Action, ActionRejection>;

/// Builds the backend call for one action from request parameters.
pub type ActionHandler = fn(&RequestContext) -> Built;

/// Immutable name-to-handler lookup built at startup.
pub struct ActionTable {
    handlers: HashMap<&'static str, ActionHandler>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTable {
    pub fn new() -> Self {
        let entries: [(&'static str, ActionHandler); 37] = [
            ("get_login_info", |_| Ok(Action::GetLoginInfo)),
            ("get_friend_list", |_| Ok(Action::GetFriendList)),
            ("get_group_list", get_group_list),
            ("get_group_info", get_group_info),
            ("get_group_member_list", get_group_member_list),
            ("get_group_member_info", get_group_member_info),
            ("send_msg", send_msg),
            ("send_group_msg", send_group_msg),
            ("send_group_forward_msg", send_group_forward_msg),
            ("send_private_msg", send_private_msg),
            ("delete_msg", delete_msg),
            ("set_friend_add_request", set_friend_add_request),
            ("set_group_add_request", set_group_add_request),
            ("set_group_card", set_group_card),
            ("set_group_special_title", set_group_special_title),
            ("set_group_kick", set_group_kick),
            ("set_group_ban", set_group_ban),
            ("set_group_whole_ban", set_group_whole_ban),
            ("set_group_name", set_group_name),
            ("set_group_admin", set_group_admin),
            ("_send_group_notice", send_group_notice),
            ("set_group_leave", set_group_leave),
            ("get_image", get_image),
            ("get_forward_msg", get_forward_msg),
            ("get_group_msg", get_group_msg),
            ("get_group_honor_info", get_group_honor_info),
            ("can_send_image", |_| Ok(Action::CanSendImage)),
            ("can_send_record", |_| Ok(Action::CanSendRecord)),
            ("get_status", |_| Ok(Action::GetStatus)),
            ("get_version_info", |_| Ok(Action::GetVersionInfo)),
            ("_get_vip_info", get_vip_info),
            ("get_stranger_info", get_stranger_info),
            ("reload_event_filter", |_| Ok(Action::ReloadEventFilter)),
            ("set_group_portrait", set_group_portrait),
            (".handle_quick_operation", handle_quick_operation),
            (".ocr_image", ocr_image),
            (".get_word_slices", get_word_slices),
        ];

        Self {
            handlers: entries.into_iter().collect(),
        }
    }

    /// Look up a handler by (already normalized) name, returning the
    /// canonical registered name alongside it.
    pub fn get(&self, name: &str) -> Option<(&'static str, ActionHandler)> {
        self.handlers
            .get_key_value(name)
            .map(|(name, handler)| (*name, *handler))
    }

    /// Look up a raw action name, stripping any `_async` suffix first.
    pub fn resolve(&self, action: &str) -> Option<(&'static str, ActionHandler)> {
        self.get(normalize_action(action))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

/// Strip a trailing `_async`. Async variants share the synchronous handler.
pub fn normalize_action(action: &str) -> &str {
    action.strip_suffix("_async").unwrap_or(action)
}

/// Route handler for `/{action}`.
pub async fn handle_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    ctx: RequestContext,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if !limiter.admit().await {
            debug!(action = %action, "Rate limiter rejected API call");
            return Json(ActionResponse::failed(RETCODE_RATE_LIMITED)).into_response();
        }
    }

    let name = normalize_action(&action);
    debug!(action = %name, "HTTP server received API call");

    let Some((_, handler)) = state.actions.get(name) else {
        return Json(ActionResponse::failed(RETCODE_UNKNOWN_ACTION)).into_response();
    };

    match handler(&ctx) {
        Ok(call) => Json(state.backend.execute(call).await).into_response(),
        Err(ActionRejection::Http(e)) => e.into_response(),
        Err(ActionRejection::Failed(envelope)) => Json(envelope).into_response(),
    }
}

fn bad_params(msg: &str) -> ActionRejection {
    ActionRejection::Failed(ActionResponse::failed(RETCODE_BAD_PARAMS).with_msg(msg))
}

fn message(ctx: &RequestContext, key: &str) -> MessageContent {
    match ctx.param_with_type(key) {
        Param::Json(segments) => MessageContent::Segments(segments),
        other => MessageContent::Text(other.as_str().into_owned()),
    }
}

fn get_group_list(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupList {
        no_cache: ctx.param_flag("no_cache", false),
    })
}

fn get_group_info(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupInfo {
        group_id: ctx.param_i64("group_id"),
    })
}

fn get_group_member_list(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupMemberList {
        group_id: ctx.param_i64("group_id"),
        no_cache: ctx.param_flag("no_cache", false),
    })
}

fn get_group_member_info(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupMemberInfo {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
    })
}

/// Explicit `message_type` first, then `group_id`, then `user_id`.
fn send_msg(ctx: &RequestContext) -> Built {
    match ctx.param("message_type").as_str() {
        "private" => send_private_msg(ctx),
        "group" => send_group_msg(ctx),
        _ if !ctx.param_with_type("group_id").is_empty() => send_group_msg(ctx),
        _ if !ctx.param_with_type("user_id").is_empty() => send_private_msg(ctx),
        _ => Err(bad_params("send_msg requires message_type, group_id or user_id")),
    }
}

fn send_private_msg(ctx: &RequestContext) -> Built {
    Ok(Action::SendPrivateMessage {
        user_id: ctx.param_i64("user_id"),
        message: message(ctx, "message"),
        auto_escape: ctx.param_bool("auto_escape", false),
    })
}

fn send_group_msg(ctx: &RequestContext) -> Built {
    Ok(Action::SendGroupMessage {
        group_id: ctx.param_i64("group_id"),
        message: message(ctx, "message"),
        auto_escape: ctx.param_bool("auto_escape", false),
    })
}

fn send_group_forward_msg(ctx: &RequestContext) -> Built {
    let messages = match ctx.param_with_type("messages") {
        Param::Json(value) => value,
        other => serde_json::from_str(&other.as_str()).unwrap_or(Value::Null),
    };
    Ok(Action::SendGroupForwardMessage {
        group_id: ctx.param_i64("group_id"),
        messages,
    })
}

fn delete_msg(ctx: &RequestContext) -> Built {
    Ok(Action::DeleteMessage {
        message_id: ctx.param_i32("message_id"),
    })
}

fn set_friend_add_request(ctx: &RequestContext) -> Built {
    Ok(Action::ProcessFriendRequest {
        flag: ctx.param("flag"),
        approve: ctx.param_flag("approve", true),
    })
}

fn set_group_add_request(ctx: &RequestContext) -> Built {
    let mut sub_type = ctx.param("sub_type");
    if sub_type.is_empty() {
        sub_type = ctx.param("type");
    }
    Ok(Action::ProcessGroupRequest {
        flag: ctx.param("flag"),
        sub_type,
        reason: ctx.param("reason"),
        approve: ctx.param_flag("approve", true),
    })
}

fn set_group_card(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupCard {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
        card: ctx.param("card"),
    })
}

fn set_group_special_title(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupSpecialTitle {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
        special_title: ctx.param("special_title"),
    })
}

fn set_group_kick(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupKick {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
        message: ctx.param("message"),
    })
}

fn set_group_ban(ctx: &RequestContext) -> Built {
    let duration = ctx.param_or("duration", "1800").trim().parse::<i64>().unwrap_or(0);
    Ok(Action::SetGroupBan {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
        duration: u32::try_from(duration.max(0)).unwrap_or(u32::MAX),
    })
}

fn set_group_whole_ban(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupWholeBan {
        group_id: ctx.param_i64("group_id"),
        enable: ctx.param_flag("enable", true),
    })
}

fn set_group_name(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupName {
        group_id: ctx.param_i64("group_id"),
        group_name: ctx.param("group_name"),
    })
}

fn set_group_admin(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupAdmin {
        group_id: ctx.param_i64("group_id"),
        user_id: ctx.param_i64("user_id"),
        enable: ctx.param_flag("enable", true),
    })
}

fn send_group_notice(ctx: &RequestContext) -> Built {
    Ok(Action::SendGroupNotice {
        group_id: ctx.param_i64("group_id"),
        content: ctx.param("content"),
    })
}

fn set_group_leave(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupLeave {
        group_id: ctx.param_i64("group_id"),
    })
}

fn get_image(ctx: &RequestContext) -> Built {
    Ok(Action::GetImage {
        file: ctx.param("file"),
    })
}

fn get_forward_msg(ctx: &RequestContext) -> Built {
    Ok(Action::GetForwardMessage {
        message_id: ctx.param("message_id"),
    })
}

fn get_group_msg(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupMessage {
        message_id: ctx.param_i32("message_id"),
    })
}

fn get_group_honor_info(ctx: &RequestContext) -> Built {
    Ok(Action::GetGroupHonorInfo {
        group_id: ctx.param_i64("group_id"),
        honor_type: ctx.param("type"),
    })
}

fn get_vip_info(ctx: &RequestContext) -> Built {
    Ok(Action::GetVipInfo {
        user_id: ctx.param_i64("user_id"),
    })
}

fn get_stranger_info(ctx: &RequestContext) -> Built {
    Ok(Action::GetStrangerInfo {
        user_id: ctx.param_i64("user_id"),
    })
}

fn set_group_portrait(ctx: &RequestContext) -> Built {
    Ok(Action::SetGroupPortrait {
        group_id: ctx.param_i64("group_id"),
        file: ctx.param("file"),
        cache: ctx.param("cache"),
    })
}

/// POST only; reads `context` and `operation` straight from the JSON body.
fn handle_quick_operation(ctx: &RequestContext) -> Built {
    if ctx.method() != axum::http::Method::POST {
        return Err(ActionRejection::Http(ApiError::NotFound));
    }
    let body = ctx
        .json_body()
        .ok_or_else(|| bad_params("quick operation requires a JSON body"))?;
    let member = |key: &str| body.get(key).cloned().unwrap_or(Value::Null);
    Ok(Action::HandleQuickOperation {
        context: member("context"),
        operation: member("operation"),
    })
}

fn ocr_image(ctx: &RequestContext) -> Built {
    Ok(Action::OcrImage {
        image: ctx.param("image"),
    })
}

fn get_word_slices(ctx: &RequestContext) -> Built {
    Ok(Action::GetWordSlices {
        content: ctx.param("content"),
    })
}
