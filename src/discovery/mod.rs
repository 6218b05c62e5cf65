//! 服务发现模块
//!
//! 注册中心成员变化 → [`Instancer`]（实例快照）→ [`Endpointer`]（端点快照）。
//! 后端可以是 Consul（生产）或内存注册表（测试、本地开发）。

pub mod backend;
pub mod endpointer;
pub mod instance;
pub mod instancer;

pub use backend::{ConsulBackend, DiscoveryBackend, InstanceQuery, MemoryBackend, QueryResult};
pub use endpointer::{EndpointSet, EndpointSource, Endpointer, FixedEndpointer};
pub use instance::ServiceInstance;
pub use instancer::{InstanceSet, Instancer, InstancerConfig};
