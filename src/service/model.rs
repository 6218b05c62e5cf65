//! 资料与地址数据模型

use serde::{Deserialize, Serialize};

/// 用户资料
///
/// 空的 `name` / `addresses` 在编码时省略，解码时取默认值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
}

/// 地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            addresses: Vec::new(),
        }
    }

    /// 添加地址
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }
}

impl Address {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
        }
    }
}
