use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    pub session_id: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CodeUpdateMessage {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserCountMessage {
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PongMessage {
    pub date: String,
}

/// Events a client may send
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join-session")]
    Join(JoinMessage),
    #[serde(rename = "code-change")]
    Edit(EditMessage),
    #[serde(rename = "ping")]
    Ping,
}

/// Events the server pushes to a client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "code-update")]
    CodeUpdate(CodeUpdateMessage),
    #[serde(rename = "user-count")]
    UserCount(UserCountMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

impl SendMessage {
    pub fn code_update(code: impl Into<String>) -> Self {
        SendMessage::CodeUpdate(CodeUpdateMessage { code: code.into() })
    }

    pub fn user_count(count: usize) -> Self {
        SendMessage::UserCount(UserCountMessage { count })
    }

    pub fn error(message: impl Into<String>) -> Self {
        SendMessage::Error(ErrorMessage { message: message.into() })
    }
}
