//! wpfleet コアモデル
//!
//! テナント（WordPress サイト）1件ぶんのプロビジョニング結果を表す
//! [`Installation`] と、テナントIDと作成時刻から各リソース名を導出する
//! 命名規則 [`ResourceNames`] を提供します。
//!
//! このクレートは I/O を一切行いません。

pub mod error;
pub mod model;
pub mod naming;
pub mod wait;

pub use error::*;
pub use model::*;
pub use naming::*;
pub use wait::*;
