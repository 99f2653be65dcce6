use chrono::{DateTime, Utc};

use super::message::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Admin,
    User,
}

impl AccountRole {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// An operator account as listed by the administration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub role: AccountRole,
    pub created_at: String,
    /// `"0"` means the account never expires.
    pub expire_at: String,
    pub is_banned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Expired,
    Banned,
    /// Expiry date present but unreadable.
    Unknown,
}

impl AccountStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Banned => "banned",
            Self::Unknown => "n/a",
        }
    }
}

impl AdminAccount {
    pub fn status_at(&self, now: DateTime<Utc>) -> AccountStatus {
        if self.is_banned {
            return AccountStatus::Banned;
        }
        if self.expire_at == "0" || self.expire_at.is_empty() {
            return AccountStatus::Active;
        }

        match parse_timestamp(&self.expire_at) {
            Some(expires) if expires < now => AccountStatus::Expired,
            Some(_) => AccountStatus::Active,
            None => AccountStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountTotals {
    pub accounts: u64,
    pub admins: u64,
    pub users: u64,
    pub banned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountsPage {
    pub accounts: Vec<AdminAccount>,
    pub totals: AccountTotals,
}

/// The logged-in operator as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdminProfile {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Subscription extension offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendTerm {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl ExtendTerm {
    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            1 => Some(Self::OneMonth),
            3 => Some(Self::ThreeMonths),
            6 => Some(Self::SixMonths),
            12 => Some(Self::OneYear),
            _ => None,
        }
    }

    /// Label the backend matches on; it is not translated.
    pub fn wire_label(self) -> &'static str {
        match self {
            Self::OneMonth => "1 tháng",
            Self::ThreeMonths => "3 tháng",
            Self::SixMonths => "6 tháng",
            Self::OneYear => "1 năm",
        }
    }
}
