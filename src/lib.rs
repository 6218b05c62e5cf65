//! Skipper
//!
//! A discovery-backed, load-balanced, retrying client for the profile service,
//! plus the service host that serves it over HTTP.
//!
//! Client side, per operation:
//! Instancer (registry watch) → Endpointer (endpoint set) → RoundRobin → Retry.
//!
//! Server side:
//! `InmemService` → `LoggingMiddleware` → HTTP router → `ServiceRuntime`.

pub mod client;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod lb;
pub mod middleware;
pub mod service;
pub mod telemetry;
pub mod transport;
pub mod utils;

// 服务运行时
pub mod runtime;

// Re-exports
pub use client::{Client, Endpoints, factory_for};
pub use config::ClientConfig;
pub use discovery::{
    ConsulBackend, DiscoveryBackend, EndpointSet, EndpointSource, Endpointer, InstanceQuery,
    Instancer, MemoryBackend, ServiceInstance,
};
pub use endpoint::{Endpoint, Factory, Operation, Request, Response};
pub use error::{ErrorCategory, ErrorCode, Result, SkipperError};
pub use lb::{Balancer, Random, Retry, RoundRobin};
pub use middleware::{LoggingLayer, LoggingMiddleware};
pub use service::{Address, InmemService, Profile, ProfileService};
pub use transport::http::{HttpClient, make_http_handler};

// 运行时 re-exports
pub use runtime::{ExitReason, ReadyCheck, ServiceRuntime};
