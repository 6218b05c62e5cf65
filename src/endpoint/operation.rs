//! 操作描述符与请求/响应定义

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SkipperError};
use crate::service::{Address, Profile};

/// 操作描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    PostProfile,
    GetProfile,
    PutProfile,
    PatchProfile,
    DeleteProfile,
    GetAddresses,
    GetAddress,
    PostAddress,
    DeleteAddress,
}

impl Operation {
    /// 全部操作，客户端装配按此顺序逐个构建
    pub const ALL: [Operation; 9] = [
        Operation::PostProfile,
        Operation::GetProfile,
        Operation::PutProfile,
        Operation::PatchProfile,
        Operation::DeleteProfile,
        Operation::GetAddresses,
        Operation::GetAddress,
        Operation::PostAddress,
        Operation::DeleteAddress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::PostProfile => "PostProfile",
            Operation::GetProfile => "GetProfile",
            Operation::PutProfile => "PutProfile",
            Operation::PatchProfile => "PatchProfile",
            Operation::DeleteProfile => "DeleteProfile",
            Operation::GetAddresses => "GetAddresses",
            Operation::GetAddress => "GetAddress",
            Operation::PostAddress => "PostAddress",
            Operation::DeleteAddress => "DeleteAddress",
        }
    }

    /// 操作是否幂等
    ///
    /// POST 类操作不幂等：重试可能导致重复创建（远端已执行但应答丢失）
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Operation::PostProfile | Operation::PostAddress)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown operation: {}", s))
    }
}

/// 请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    PostProfile { profile: Profile },
    GetProfile { id: String },
    PutProfile { id: String, profile: Profile },
    PatchProfile { id: String, profile: Profile },
    DeleteProfile { id: String },
    GetAddresses { profile_id: String },
    GetAddress { profile_id: String, address_id: String },
    PostAddress { profile_id: String, address: Address },
    DeleteAddress { profile_id: String, address_id: String },
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::PostProfile { .. } => Operation::PostProfile,
            Request::GetProfile { .. } => Operation::GetProfile,
            Request::PutProfile { .. } => Operation::PutProfile,
            Request::PatchProfile { .. } => Operation::PatchProfile,
            Request::DeleteProfile { .. } => Operation::DeleteProfile,
            Request::GetAddresses { .. } => Operation::GetAddresses,
            Request::GetAddress { .. } => Operation::GetAddress,
            Request::PostAddress { .. } => Operation::PostAddress,
            Request::DeleteAddress { .. } => Operation::DeleteAddress,
        }
    }
}

/// 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Empty,
    Profile(Profile),
    Addresses(Vec<Address>),
    Address(Address),
}

impl Response {
    pub fn into_empty(self) -> Result<()> {
        match self {
            Response::Empty => Ok(()),
            other => Err(unexpected("empty", &other)),
        }
    }

    pub fn into_profile(self) -> Result<Profile> {
        match self {
            Response::Profile(p) => Ok(p),
            other => Err(unexpected("profile", &other)),
        }
    }

    pub fn into_addresses(self) -> Result<Vec<Address>> {
        match self {
            Response::Addresses(a) => Ok(a),
            other => Err(unexpected("addresses", &other)),
        }
    }

    pub fn into_address(self) -> Result<Address> {
        match self {
            Response::Address(a) => Ok(a),
            other => Err(unexpected("address", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Response) -> SkipperError {
    SkipperError::Internal(format!("expected {} response, got {:?}", expected, got))
}
