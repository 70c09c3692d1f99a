//! Route table for the REST API.
//!
//! Each [`Route`] knows its HTTP method, its path (with room IDs
//! percent-encoded as a single segment) and which credential it needs.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;

use crate::error::SocketlinkError;

/// Prefix shared by every REST path.
pub const API_PREFIX: &str = "/api/v1";

/// Whether an operation enables or disables messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingAction {
    Enable,
    Disable,
}

impl MessagingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl fmt::Display for MessagingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagingAction {
    type Err = SocketlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            other => Err(SocketlinkError::InvalidAction(other.to_owned())),
        }
    }
}

/// Credential an operation authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `api-key: <admin key>`
    Admin,
    /// `api-key: <client key>` plus `uid: <user id>`
    Client,
    /// No credential.
    Public,
}

/// Every REST operation the client can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Metrics,
    MysqlSync,
    AllRooms,
    OrphanUsers,
    UsersInRooms,
    SubscribeToRoom { rid: String },
    UnsubscribeFromRoom { rid: String },
    AllSubscriptions,
    SubscriptionsForUsers,
    BroadcastToEveryone,
    BroadcastInRooms,
    BroadcastToUsers,
    BanUsers,
    UnbanUsers,
    ServerMessaging(MessagingAction),
    RoomMessaging(MessagingAction),
    BannedUsers,
    MessagingDisabledUsers,
    RoomMessages { rid: String },
    DeleteLocalDatabase,
    Ping,
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Self::UsersInRooms
            | Self::SubscriptionsForUsers
            | Self::BroadcastToEveryone
            | Self::BroadcastInRooms
            | Self::BroadcastToUsers
            | Self::BanUsers
            | Self::UnbanUsers
            | Self::RoomMessaging(_) => Method::POST,
            Self::ServerMessaging(_) => Method::PUT,
            Self::DeleteLocalDatabase => Method::DELETE,
            _ => Method::GET,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::SubscribeToRoom { .. }
            | Self::UnsubscribeFromRoom { .. }
            | Self::RoomMessages { .. } => Scope::Client,
            Self::Ping => Scope::Public,
            _ => Scope::Admin,
        }
    }

    /// Absolute path, including [`API_PREFIX`].
    pub fn path(&self) -> String {
        let tail = match self {
            Self::Metrics => "/metrics".to_owned(),
            Self::MysqlSync => "/mysql/sync".to_owned(),
            Self::AllRooms => "/rooms/users/all".to_owned(),
            Self::OrphanUsers => "/users/orphan".to_owned(),
            Self::UsersInRooms => "/rooms/users".to_owned(),
            Self::SubscribeToRoom { rid } => format!("/users/subscribe/room/{}", encode(rid)),
            Self::UnsubscribeFromRoom { rid } => {
                format!("/users/unsubscribe/room/{}", encode(rid))
            }
            Self::AllSubscriptions => "/users/subscriptions/all".to_owned(),
            Self::SubscriptionsForUsers => "/users/subscriptions".to_owned(),
            Self::BroadcastToEveryone => "/broadcast".to_owned(),
            Self::BroadcastInRooms => "/rooms/broadcast".to_owned(),
            Self::BroadcastToUsers => "/users/broadcast".to_owned(),
            Self::BanUsers => "/rooms/users/ban".to_owned(),
            Self::UnbanUsers => "/rooms/users/unban".to_owned(),
            Self::ServerMessaging(action) => format!("/server/messaging/{action}"),
            Self::RoomMessaging(action) => format!("/rooms/messaging/{action}"),
            Self::BannedUsers => "/users/banned".to_owned(),
            Self::MessagingDisabledUsers => "/users/messaging/disabled".to_owned(),
            Self::RoomMessages { rid } => format!("/messages/room/{}", encode(rid)),
            Self::DeleteLocalDatabase => "/database".to_owned(),
            Self::Ping => "/ping".to_owned(),
        };
        format!("{API_PREFIX}{tail}")
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
