//! wpfleet コンテナランタイム連携
//!
//! オーケストレータが使う狭いインターフェース [`ContainerRuntime`] と、
//! bollard による Docker Engine 実装 [`DockerRuntime`] を提供します。

pub mod docker;
pub mod error;
pub mod runtime;
pub mod waiter;

pub use docker::*;
pub use error::*;
pub use runtime::*;
pub use waiter::*;
