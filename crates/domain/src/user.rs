use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{BirthDate, PasswordHash, Pseudo, Timestamp, UserEmail, UserId};

/// 用户在线状态。三态枚举，状态之间可以任意切换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Online,
    Offline,
    Occupied,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "ONLINE",
            UserStatus::Offline => "OFFLINE",
            UserStatus::Occupied => "OCCUPIED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ONLINE" => Some(UserStatus::Online),
            "OFFLINE" => Some(UserStatus::Offline),
            "OCCUPIED" => Some(UserStatus::Occupied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub pseudo: Pseudo,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub birthdate: BirthDate,
    pub friends: Vec<UserId>,
    pub created_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        pseudo: Pseudo,
        email: UserEmail,
        password: PasswordHash,
        birthdate: BirthDate,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            pseudo,
            email,
            password,
            avatar_url: None,
            status: UserStatus::Offline,
            birthdate,
            friends: Vec::new(),
            created_at: now,
        }
    }

    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
    }

    pub fn change_pseudo(&mut self, pseudo: Pseudo) {
        self.pseudo = pseudo;
    }

    pub fn set_avatar(&mut self, avatar_url: impl Into<String>) {
        self.avatar_url = Some(avatar_url.into());
    }

    pub fn set_password(&mut self, password: PasswordHash) {
        self.password = password;
    }

    pub fn is_friend_with(&self, other: UserId) -> bool {
        self.friends.contains(&other)
    }

    /// 幂等：已在好友列表中则不重复添加，也不允许加自己。
    pub fn add_friend(&mut self, friend: UserId) {
        if friend != self.id && !self.friends.contains(&friend) {
            self.friends.push(friend);
        }
    }

    pub fn remove_friend(&mut self, friend: UserId) {
        self.friends.retain(|id| *id != friend);
    }
}

impl User {
    /// 生成新的用户标识。
    pub fn next_id() -> UserId {
        UserId::from(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_user() -> User {
        User::register(
            User::next_id(),
            Pseudo::parse("alice").unwrap(),
            UserEmail::parse("alice@example.com").unwrap(),
            PasswordHash::new("$2b$12$hash").unwrap(),
            BirthDate::from_stored(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn new_users_start_offline_without_friends() {
        let user = sample_user();
        assert_eq!(user.status, UserStatus::Offline);
        assert!(user.friends.is_empty());
    }

    #[test]
    fn add_friend_is_idempotent_and_rejects_self() {
        let mut user = sample_user();
        let friend = User::next_id();

        user.add_friend(friend);
        user.add_friend(friend);
        user.add_friend(user.id);

        assert_eq!(user.friends, vec![friend]);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [UserStatus::Online, UserStatus::Offline, UserStatus::Occupied] {
            assert_eq!(UserStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UserStatus::parse("AWAY"), None);
    }
}
