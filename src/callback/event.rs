use super::CallbackRejection;
use serde::{Deserialize, Serialize};

/// Callback body as the document server sends it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackPayload {
    pub key: String,
    pub status: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub changesurl: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub forcesavetype: Option<i64>,
    #[serde(default)]
    pub users: Option<Vec<String>>,
    #[serde(default)]
    pub actions: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub history: Option<serde_json::Value>,
}

/// A validated callback, carrying only what its status needs.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEvent {
    /// Status 1: a user connected to or disconnected from the session.
    Editing {
        key: String,
        users: Vec<String>,
        actions: usize,
    },
    /// Status 2: the last editor left with unsaved changes.
    ReadyForSave {
        key: String,
        url: String,
        filetype: Option<String>,
        changes_url: Option<String>,
        users: Vec<String>,
    },
    /// Status 3
    SaveFailed { key: String },
    /// Status 4
    ClosedUnchanged { key: String },
    /// Status 6: a save was forced while editing continues.
    ForceSave {
        key: String,
        url: String,
        filetype: Option<String>,
        force_save_type: Option<i64>,
    },
    /// Status 7
    ForceSaveFailed { key: String },
}

impl CallbackEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Editing { key, .. }
            | Self::ReadyForSave { key, .. }
            | Self::SaveFailed { key }
            | Self::ClosedUnchanged { key }
            | Self::ForceSave { key, .. }
            | Self::ForceSaveFailed { key } => key,
        }
    }

    pub fn status(&self) -> i64 {
        match self {
            Self::Editing { .. } => 1,
            Self::ReadyForSave { .. } => 2,
            Self::SaveFailed { .. } => 3,
            Self::ClosedUnchanged { .. } => 4,
            Self::ForceSave { .. } => 6,
            Self::ForceSaveFailed { .. } => 7,
        }
    }

    /// Parse and validate a raw request body.
    pub fn from_json(body: &[u8]) -> Result<Self, CallbackRejection> {
        let payload: CallbackPayload = serde_json::from_slice(body)?;
        Self::try_from(payload)
    }
}

impl TryFrom<CallbackPayload> for CallbackEvent {
    type Error = CallbackRejection;

    fn try_from(payload: CallbackPayload) -> Result<Self, Self::Error> {
        let CallbackPayload {
            key,
            status,
            url,
            changesurl,
            filetype,
            forcesavetype,
            users,
            actions,
            history: _,
        } = payload;

        // An empty url is as useless as a missing one.
        let url = url.filter(|u| !u.trim().is_empty());

        match status {
            1 => Ok(Self::Editing {
                key,
                users: users.unwrap_or_default(),
                actions: actions.map_or(0, |a| a.len()),
            }),
            2 => Ok(Self::ReadyForSave {
                key,
                url: url.ok_or(CallbackRejection::MissingUrl)?,
                filetype,
                changes_url: changesurl,
                users: users.unwrap_or_default(),
            }),
            3 => Ok(Self::SaveFailed { key }),
            4 => Ok(Self::ClosedUnchanged { key }),
            6 => Ok(Self::ForceSave {
                key,
                url: url.ok_or(CallbackRejection::MissingUrl)?,
                filetype,
                force_save_type: forcesavetype,
            }),
            7 => Ok(Self::ForceSaveFailed { key }),
            other => Err(CallbackRejection::UnknownStatus(other)),
        }
    }
}

/// The only two responses the document server understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub error: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            error: 0,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error: 1,
            message: Some(message.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.error == 0
    }
}

impl From<Result<(), CallbackRejection>> for CallbackAck {
    fn from(outcome: Result<(), CallbackRejection>) -> Self {
        match outcome {
            Ok(()) => Self::accepted(),
            Err(rejection) => Self::rejected(rejection.to_string()),
        }
    }
}
